//! Scripted collaborators for pipeline tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use imgocr_core::gateway::{GatewayError, ImageGateway, ImageMetadata};
use imgocr_core::job::JobQueue;
use imgocr_core::notify::{DeliveryError, Notifier};
use imgocr_core::ocr::{OcrEngine, OcrError, OcrOutput};
use imgocr_core::retry::RetryPolicy;
use imgocr_core::types::DbId;
use imgocr_pipeline::{MemoryJobQueue, Orchestrator, Services};

pub const IMAGE_BYTES: &[u8] = b"\x89PNG fake";

pub fn metadata(id: DbId) -> ImageMetadata {
    ImageMetadata {
        id,
        title: "Scanned page".into(),
        image_url: Some(format!("http://images.test/media/images/{id}.png")),
        uploaded_at: chrono::Utc::now(),
        size: IMAGE_BYTES.len() as i64,
        width: 100,
        height: 50,
        format: "png".into(),
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeGateway {
    images: Mutex<HashMap<DbId, ImageMetadata>>,
    /// Popped before every metadata lookup.
    scripted_failures: Mutex<VecDeque<GatewayError>>,
    always_unavailable: bool,
    pub metadata_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            always_unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_image(self, meta: ImageMetadata) -> Self {
        self.images.lock().unwrap().insert(meta.id, meta);
        self
    }

    pub fn fail_next(self, err: GatewayError) -> Self {
        self.scripted_failures.lock().unwrap().push_back(err);
        self
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGateway for FakeGateway {
    async fn fetch_image_metadata(&self, image_id: DbId) -> Result<ImageMetadata, GatewayError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.always_unavailable {
            return Err(GatewayError::UpstreamUnavailable("connection refused".into()));
        }
        if let Some(err) = self.scripted_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.images
            .lock()
            .unwrap()
            .get(&image_id)
            .cloned()
            .ok_or(GatewayError::ImageNotFound(image_id))
    }

    async fn fetch_image_bytes(&self, _url: &str) -> Result<Vec<u8>, GatewayError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        Ok(IMAGE_BYTES.to_vec())
    }
}

// ---------------------------------------------------------------------------
// OCR
// ---------------------------------------------------------------------------

pub struct FakeOcr {
    failures_left: AtomicUsize,
    output: OcrOutput,
    pub calls: AtomicUsize,
}

impl FakeOcr {
    pub fn reading(text: &str, confidence: f64) -> Self {
        Self {
            failures_left: AtomicUsize::new(0),
            output: OcrOutput {
                text: text.into(),
                confidence,
            },
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail the first `n` calls.
    pub fn failing(n: usize) -> Self {
        let ocr = Self::reading("recovered", 50.0);
        ocr.failures_left.store(n, Ordering::SeqCst);
        ocr
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn extract(&self, image: &[u8]) -> Result<OcrOutput, OcrError> {
        assert_eq!(image, IMAGE_BYTES);
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(OcrError::Processing("tesseract exited with code 1".into()));
        }
        Ok(self.output.clone())
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    pub sent: Mutex<Vec<(String, DbId, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broken() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, DbId, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, _subject: &str, body: &str) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Transport("connection refused".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), DbId::nil(), body.to_string()));
        Ok(())
    }

    async fn send_ocr_result(
        &self,
        to: &str,
        image: &ImageMetadata,
        text: &str,
        _confidence: f64,
    ) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Transport("connection refused".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), image.id, text.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub queue: Arc<MemoryJobQueue>,
    pub gateway: Arc<FakeGateway>,
    pub ocr: Arc<FakeOcr>,
    pub notifier: Arc<RecordingNotifier>,
    pub orchestrator: Arc<Orchestrator>,
}

pub const RETRY_DELAY: Duration = Duration::from_secs(60);

pub fn harness(
    gateway: FakeGateway,
    ocr: FakeOcr,
    notifier: RecordingNotifier,
    default_email: Option<&str>,
) -> Harness {
    let queue = Arc::new(MemoryJobQueue::new());
    let gateway = Arc::new(gateway);
    let ocr = Arc::new(ocr);
    let notifier = Arc::new(notifier);
    let services = Services::new(gateway.clone(), ocr.clone(), notifier.clone());
    let orchestrator = Arc::new(Orchestrator::new(
        queue.clone() as Arc<dyn JobQueue>,
        services,
        RetryPolicy::new(3, RETRY_DELAY),
        default_email.map(str::to_string),
    ));
    Harness {
        queue,
        gateway,
        ocr,
        notifier,
        orchestrator,
    }
}
