use axum::routing::get;
use axum::Router;

use crate::handlers::health;
use crate::state::{ImageState, OcrState};

pub fn image_router() -> Router<ImageState> {
    Router::new()
        .route("/health", get(health::image_health))
        .route("/metrics", get(health::image_metrics))
}

pub fn ocr_router() -> Router<OcrState> {
    Router::new()
        .route("/health", get(health::ocr_health))
        .route("/metrics", get(health::ocr_metrics))
}
