//! Router builders and request helpers shared by the API integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use imgocr_api::app::{build_image_app, build_ocr_app};
use imgocr_api::config::{ImageServiceConfig, ServerConfig};
use imgocr_api::state::{ImageState, OcrState};
use imgocr_core::gateway::{GatewayError, ImageGateway, ImageMetadata};
use imgocr_core::job::JobQueue;
use imgocr_core::notify::{DeliveryError, Notifier};
use imgocr_core::types::DbId;
use imgocr_pipeline::MemoryJobQueue;

pub const BASE_URL: &str = "http://images.test";
const BOUNDARY: &str = "imgocr-test-boundary";

/// Server configuration with the development CORS origin.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

// ---------------------------------------------------------------------------
// Image service
// ---------------------------------------------------------------------------

pub fn image_config(media_root: &Path) -> ImageServiceConfig {
    ImageServiceConfig {
        media_root: media_root.to_path_buf(),
        public_base_url: BASE_URL.to_string(),
        max_upload_bytes: 1024 * 1024,
        detail_cache_ttl: Duration::from_secs(600),
    }
}

/// Full image service router over `pool`, storing binaries under `media_root`.
pub fn build_image_test_app(pool: PgPool, media_root: &Path) -> Router {
    let state = ImageState::new(pool, image_config(media_root));
    build_image_app(state, &test_config()).unwrap()
}

/// A small valid PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Encode a multipart form with an optional title and an optional file part.
pub fn multipart_body(title: Option<&str>, file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(title) = title {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{title}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: Router, uri: &str, body: Vec<u8>) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Upload a PNG and return the created record.
pub async fn upload_png(app: Router, title: &str) -> serde_json::Value {
    let png = png_bytes(4, 3);
    let response = post_multipart(
        app,
        "/api/images/",
        multipart_body(Some(title), Some(("scan.png", &png))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// OCR service
// ---------------------------------------------------------------------------

/// Gateway serving a fixed set of images.
#[derive(Default)]
pub struct StubGateway {
    images: Mutex<HashMap<DbId, ImageMetadata>>,
}

impl StubGateway {
    pub fn with_image(self, meta: ImageMetadata) -> Self {
        self.images.lock().unwrap().insert(meta.id, meta);
        self
    }
}

#[async_trait]
impl ImageGateway for StubGateway {
    async fn fetch_image_metadata(&self, image_id: DbId) -> Result<ImageMetadata, GatewayError> {
        self.images
            .lock()
            .unwrap()
            .get(&image_id)
            .cloned()
            .ok_or(GatewayError::ImageNotFound(image_id))
    }

    async fn fetch_image_bytes(&self, _url: &str) -> Result<Vec<u8>, GatewayError> {
        Ok(Vec::new())
    }
}

pub fn metadata(id: DbId, title: &str) -> ImageMetadata {
    ImageMetadata {
        id,
        title: title.into(),
        image_url: Some(format!("{BASE_URL}/media/images/{id}.png")),
        uploaded_at: chrono::Utc::now(),
        size: 10,
        width: 2,
        height: 2,
        format: "png".into(),
    }
}

/// Records plain messages; optionally refuses every send.
#[derive(Default)]
pub struct RecordingNotifier {
    broken: bool,
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingNotifier {
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        if self.broken {
            return Err(DeliveryError::Transport("connection refused".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.into(), subject.into(), body.into()));
        Ok(())
    }

    async fn send_ocr_result(
        &self,
        to: &str,
        image: &ImageMetadata,
        text: &str,
        _confidence: f64,
    ) -> Result<(), DeliveryError> {
        self.send(to, &format!("OCR results for image: {}", image.title), text)
            .await
    }
}

pub struct OcrHarness {
    pub app: Router,
    pub queue: Arc<MemoryJobQueue>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn build_ocr_test_app(gateway: StubGateway, notifier: RecordingNotifier) -> OcrHarness {
    let queue = Arc::new(MemoryJobQueue::new());
    let notifier = Arc::new(notifier);
    let state = OcrState::new(
        queue.clone() as Arc<dyn JobQueue>,
        Arc::new(gateway),
        notifier.clone() as Arc<dyn Notifier>,
    );
    OcrHarness {
        app: build_ocr_app(state, &test_config()).unwrap(),
        queue,
        notifier,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
