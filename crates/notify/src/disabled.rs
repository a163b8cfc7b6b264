use async_trait::async_trait;
use imgocr_core::gateway::ImageMetadata;
use imgocr_core::notify::{DeliveryError, Notifier};

/// Notifier used when no mail transport is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, to: &str, _subject: &str, _body: &str) -> Result<(), DeliveryError> {
        tracing::debug!(to, "Email delivery disabled, dropping message");
        Err(DeliveryError::NotConfigured)
    }

    async fn send_ocr_result(
        &self,
        to: &str,
        image: &ImageMetadata,
        _text: &str,
        _confidence: f64,
    ) -> Result<(), DeliveryError> {
        tracing::debug!(to, image_id = %image.id, "Email delivery disabled, dropping OCR result");
        Err(DeliveryError::NotConfigured)
    }
}
