//! Cross-service access to image metadata and binaries.
//!
//! The OCR side never reads the image store directly. It asks the image
//! service for a record's metadata (including an absolute `image_url`) and
//! then downloads the binary from that URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Metadata payload served by `GET /api/images/{id}/api-data/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub id: DbId,
    pub title: String,
    /// Absolute URL of the binary. `None` when the record has no file.
    pub image_url: Option<String>,
    pub uploaded_at: Timestamp,
    pub size: i64,
    pub width: i32,
    pub height: i32,
    pub format: String,
}

/// Failures reported by an [`ImageGateway`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The image service answered 404 for this id. Permanent.
    #[error("Image with id {0} not found")]
    ImageNotFound(DbId),

    /// Timeout, connection failure or unexpected status. Transient.
    #[error("Image service unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl GatewayError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::UpstreamUnavailable(_))
    }
}

/// Read access to the image service.
#[async_trait]
pub trait ImageGateway: Send + Sync {
    /// Fetch metadata for one image.
    async fn fetch_image_metadata(&self, image_id: DbId) -> Result<ImageMetadata, GatewayError>;

    /// Download the binary behind an `image_url`.
    async fn fetch_image_bytes(&self, url: &str) -> Result<Vec<u8>, GatewayError>;
}
