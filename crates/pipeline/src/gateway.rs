//! HTTP client for the image service.
//!
//! Every request carries the configured timeout. A 404 on the metadata
//! endpoint is the only permanent failure; everything else (other statuses,
//! timeouts, connection errors, undecodable bodies) is reported as
//! [`GatewayError::UpstreamUnavailable`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use imgocr_core::gateway::{GatewayError, ImageGateway, ImageMetadata};
use imgocr_core::types::DbId;

/// [`ImageGateway`] over the image service's REST API.
pub struct HttpImageGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpImageGateway {
    /// Create a gateway for `base_url` (e.g. `http://images:8000/api`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn metadata_url(&self, image_id: DbId) -> String {
        format!("{}/images/{image_id}/api-data/", self.base_url)
    }
}

fn unavailable(err: reqwest::Error) -> GatewayError {
    let reason = if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    };
    GatewayError::UpstreamUnavailable(reason)
}

#[async_trait]
impl ImageGateway for HttpImageGateway {
    async fn fetch_image_metadata(&self, image_id: DbId) -> Result<ImageMetadata, GatewayError> {
        let url = self.metadata_url(image_id);
        let response = self.client.get(&url).send().await.map_err(unavailable)?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::warn!(%image_id, "Image not found in image service");
                Err(GatewayError::ImageNotFound(image_id))
            }
            status if status.is_success() => response.json::<ImageMetadata>().await.map_err(|e| {
                GatewayError::UpstreamUnavailable(format!("invalid metadata payload: {e}"))
            }),
            status => {
                tracing::warn!(%image_id, %status, "Image service returned an error");
                Err(GatewayError::UpstreamUnavailable(format!(
                    "image service returned {status}"
                )))
            }
        }
    }

    async fn fetch_image_bytes(&self, url: &str) -> Result<Vec<u8>, GatewayError> {
        let response = self.client.get(url).send().await.map_err(unavailable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::UpstreamUnavailable(format!(
                "image download from {url} returned {status}"
            )));
        }

        let bytes = response.bytes().await.map_err(unavailable)?;
        tracing::debug!(url, bytes = bytes.len(), "Downloaded image");
        Ok(bytes.to_vec())
    }
}
