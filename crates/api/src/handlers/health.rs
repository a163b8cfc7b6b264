use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use imgocr_core::status::JobState;

use crate::metrics::render_gauge;
use crate::state::{ImageState, OcrState};

/// Prometheus exposition content type.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Health payload of the image service.
#[derive(Serialize)]
pub struct ImageHealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub db_healthy: bool,
}

/// Health payload of the OCR service.
#[derive(Serialize)]
pub struct OcrHealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub queue_healthy: bool,
}

fn status_word(healthy: bool) -> &'static str {
    if healthy {
        "ok"
    } else {
        "degraded"
    }
}

/// GET /health (image service)
pub async fn image_health(State(state): State<ImageState>) -> Json<ImageHealthResponse> {
    let db_healthy = imgocr_db::health_check(&state.pool).await.is_ok();
    Json(ImageHealthResponse {
        status: status_word(db_healthy),
        service: "images",
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
    })
}

/// GET /health (OCR service)
pub async fn ocr_health(State(state): State<OcrState>) -> Json<OcrHealthResponse> {
    let queue_healthy = state.queue.count_by_state().await.is_ok();
    Json(OcrHealthResponse {
        status: status_word(queue_healthy),
        service: "ocr",
        version: env!("CARGO_PKG_VERSION"),
        queue_healthy,
    })
}

/// GET /metrics (image service)
pub async fn image_metrics(State(state): State<ImageState>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], state.metrics.render())
}

/// GET /metrics (OCR service) -- request metrics plus queue depth per state.
pub async fn ocr_metrics(State(state): State<OcrState>) -> impl IntoResponse {
    let mut body = state.metrics.render();
    match state.queue.count_by_state().await {
        Ok(counts) => {
            let samples: Vec<(&str, i64)> = JobState::ALL
                .iter()
                .map(|s| {
                    let n = counts.iter().find(|(c, _)| c == s).map_or(0, |(_, n)| *n);
                    (s.label(), n)
                })
                .collect();
            body.push_str(&render_gauge("ocr_jobs", "OCR jobs by state.", "state", &samples));
        }
        Err(e) => tracing::warn!(error = %e, "Could not read queue depth for metrics"),
    }
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body)
}
