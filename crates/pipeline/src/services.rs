use std::sync::Arc;

use imgocr_core::gateway::ImageGateway;
use imgocr_core::notify::Notifier;
use imgocr_core::ocr::OcrEngine;

/// Collaborators used by the orchestrator, built once at startup.
#[derive(Clone)]
pub struct Services {
    pub gateway: Arc<dyn ImageGateway>,
    pub ocr: Arc<dyn OcrEngine>,
    pub notifier: Arc<dyn Notifier>,
}

impl Services {
    pub fn new(
        gateway: Arc<dyn ImageGateway>,
        ocr: Arc<dyn OcrEngine>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gateway,
            ocr,
            notifier,
        }
    }
}
