use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{analyze, email};
use crate::state::OcrState;

pub fn router() -> Router<OcrState> {
    Router::new()
        .route("/analyze", post(analyze::analyze))
        .route("/task_status/{task_id}", get(analyze::task_status))
        .route("/send_message_to_email", post(email::send_message_to_email))
}
