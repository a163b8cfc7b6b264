pub mod health;
pub mod images;
pub mod ocr;

use axum::Router;

use crate::state::{ImageState, OcrState};

/// Route tree of the image service.
///
/// ```text
/// /health                         service + database health
/// /metrics                        Prometheus metrics
/// /api/images/                    upload (POST), list (GET)
/// /api/images/{id}/               detail (GET), delete (DELETE)
/// /api/images/{id}/api-data/      machine-readable metadata (GET)
/// /media/*                        stored binaries
/// ```
pub fn image_routes(max_upload_bytes: usize) -> Router<ImageState> {
    Router::new()
        .merge(health::image_router())
        .merge(images::router(max_upload_bytes))
}

/// Route tree of the OCR service.
///
/// ```text
/// /health                         service + queue health
/// /metrics                        Prometheus metrics, including queue depth
/// /analyze                        submit an OCR job (POST)
/// /task_status/{task_id}          job state and result (GET)
/// /send_message_to_email          ad-hoc email (POST)
/// ```
pub fn ocr_routes() -> Router<OcrState> {
    Router::new()
        .merge(health::ocr_router())
        .merge(ocr::router())
}
