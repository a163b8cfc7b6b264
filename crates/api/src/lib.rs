//! HTTP layer for imgocr.
//!
//! Two services share this crate: the image service (upload, list, detail,
//! delete, machine-readable metadata, media files) and the OCR service (job
//! submission, job status, ad-hoc email). Each has its own state type and
//! router builder in [`app`]; the binaries under `src/bin` wire them up.

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod storage;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
