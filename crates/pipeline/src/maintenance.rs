//! Periodic queue upkeep.
//!
//! Returns jobs whose claim outlived the lease to the queue (a worker died
//! mid-job) and purges terminal jobs past the result retention window.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use imgocr_core::job::JobQueue;

/// Sweeper timings.
#[derive(Debug, Clone, Copy)]
pub struct MaintenanceConfig {
    pub interval: Duration,
    pub job_lease: Duration,
    pub result_retention: Duration,
}

impl From<&crate::PipelineConfig> for MaintenanceConfig {
    fn from(config: &crate::PipelineConfig) -> Self {
        Self {
            interval: config.maintenance_interval,
            job_lease: config.job_lease,
            result_retention: config.result_retention,
        }
    }
}

/// Run the maintenance loop until `cancel` is triggered.
pub async fn run(queue: Arc<dyn JobQueue>, config: MaintenanceConfig, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        lease_secs = config.job_lease.as_secs(),
        retention_secs = config.result_retention.as_secs(),
        "Queue maintenance started",
    );

    let mut interval = tokio::time::interval(config.interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Queue maintenance stopping");
                break;
            }
            _ = interval.tick() => sweep(queue.as_ref(), &config).await,
        }
    }
}

/// One maintenance pass. Errors are logged, never propagated.
pub async fn sweep(queue: &dyn JobQueue, config: &MaintenanceConfig) {
    match queue.requeue_stale(config.job_lease).await {
        Ok(0) => {}
        Ok(requeued) => tracing::warn!(requeued, "Returned stale OCR jobs to the queue"),
        Err(e) => tracing::error!(error = %e, "Stale job recovery failed"),
    }

    match queue.purge_expired(config.result_retention).await {
        Ok(0) => tracing::debug!("Result retention: nothing to purge"),
        Ok(purged) => tracing::info!(purged, "Result retention: purged finished jobs"),
        Err(e) => tracing::error!(error = %e, "Result retention failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryJobQueue;
    use imgocr_core::job::{DeliveryPreference, NewOcrJob};
    use imgocr_core::status::JobState;
    use imgocr_core::types::DbId;

    fn new_job() -> NewOcrJob {
        NewOcrJob {
            image_id: DbId::new_v4(),
            delivery: DeliveryPreference::default(),
        }
    }

    #[tokio::test]
    async fn sweep_requeues_and_purges() {
        let queue = MemoryJobQueue::new();
        let running = queue.enqueue(&new_job()).await.unwrap();
        queue.claim_next().await.unwrap();
        let finished = queue.enqueue(&new_job()).await.unwrap();
        queue.fail(finished.id, "x").await.unwrap();

        let config = MaintenanceConfig {
            interval: Duration::from_secs(60),
            job_lease: Duration::ZERO,
            result_retention: Duration::ZERO,
        };
        sweep(&queue, &config).await;

        let stored = queue.find(running.id).await.unwrap().unwrap();
        assert_eq!(stored.state, JobState::Pending);
        assert!(queue.find(finished.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let queue: Arc<dyn JobQueue> = Arc::new(MemoryJobQueue::new());
        let cancel = CancellationToken::new();
        let config = MaintenanceConfig {
            interval: Duration::from_millis(10),
            job_lease: Duration::from_secs(1800),
            result_retention: Duration::from_secs(3600),
        };
        let handle = tokio::spawn(run(queue, config, cancel.clone()));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
