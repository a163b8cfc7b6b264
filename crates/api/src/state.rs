use std::sync::Arc;

use imgocr_core::gateway::ImageGateway;
use imgocr_core::job::JobQueue;
use imgocr_core::notify::Notifier;

use crate::cache::DetailCache;
use crate::config::ImageServiceConfig;
use crate::metrics::Metrics;
use crate::storage::MediaStorage;

/// Shared state of the image service, available via `State<ImageState>`.
///
/// Cheaply cloneable; everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct ImageState {
    pub pool: imgocr_db::DbPool,
    pub config: Arc<ImageServiceConfig>,
    pub storage: Arc<MediaStorage>,
    pub cache: DetailCache,
    pub metrics: Arc<Metrics>,
}

impl ImageState {
    pub fn new(pool: imgocr_db::DbPool, config: ImageServiceConfig) -> Self {
        Self {
            pool,
            storage: Arc::new(MediaStorage::new(config.media_root.clone())),
            cache: DetailCache::new(config.detail_cache_ttl),
            config: Arc::new(config),
            metrics: Arc::new(Metrics::new()),
        }
    }
}

/// Shared state of the OCR service.
#[derive(Clone)]
pub struct OcrState {
    pub queue: Arc<dyn JobQueue>,
    /// Used to enrich ad-hoc emails with image titles.
    pub gateway: Arc<dyn ImageGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Arc<Metrics>,
}

impl OcrState {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        gateway: Arc<dyn ImageGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            queue,
            gateway,
            notifier,
            metrics: Arc::new(Metrics::new()),
        }
    }
}
