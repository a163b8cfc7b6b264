//! [`JobQueue`] backed by the `ocr_jobs` table.

use std::time::Duration;

use async_trait::async_trait;
use imgocr_core::job::{JobId, JobQueue, NewOcrJob, OcrJob, OcrJobResult, QueueError};
use imgocr_core::status::JobState;

use crate::repositories::OcrJobRepo;
use crate::DbPool;

/// Durable queue shared by the OCR service and every worker process.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: DbPool,
}

impl PgJobQueue {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job: &NewOcrJob) -> Result<OcrJob, QueueError> {
        let row = OcrJobRepo::enqueue(&self.pool, job)
            .await
            .map_err(QueueError::backend)?;
        OcrJob::try_from(row)
    }

    async fn claim_next(&self) -> Result<Option<OcrJob>, QueueError> {
        OcrJobRepo::claim_next(&self.pool)
            .await
            .map_err(QueueError::backend)?
            .map(OcrJob::try_from)
            .transpose()
    }

    async fn find(&self, id: JobId) -> Result<Option<OcrJob>, QueueError> {
        OcrJobRepo::find_by_id(&self.pool, id)
            .await
            .map_err(QueueError::backend)?
            .map(OcrJob::try_from)
            .transpose()
    }

    async fn mark_running(&self, id: JobId, attempt: i32) -> Result<bool, QueueError> {
        OcrJobRepo::mark_running(&self.pool, id, attempt)
            .await
            .map_err(QueueError::backend)
    }

    async fn record_attempt_error(&self, id: JobId, error: &str) -> Result<bool, QueueError> {
        OcrJobRepo::record_attempt_error(&self.pool, id, error)
            .await
            .map_err(QueueError::backend)
    }

    async fn release(&self, id: JobId, attempt: i32) -> Result<bool, QueueError> {
        OcrJobRepo::release(&self.pool, id, attempt)
            .await
            .map_err(QueueError::backend)
    }

    async fn complete(&self, id: JobId, result: &OcrJobResult) -> Result<bool, QueueError> {
        let payload = serde_json::to_value(result).map_err(QueueError::backend)?;
        OcrJobRepo::complete(&self.pool, id, &payload)
            .await
            .map_err(QueueError::backend)
    }

    async fn fail(&self, id: JobId, error: &str) -> Result<bool, QueueError> {
        OcrJobRepo::fail(&self.pool, id, error)
            .await
            .map_err(QueueError::backend)
    }

    async fn requeue_stale(&self, lease: Duration) -> Result<u64, QueueError> {
        OcrJobRepo::requeue_stale(&self.pool, lease)
            .await
            .map_err(QueueError::backend)
    }

    async fn purge_expired(&self, retention: Duration) -> Result<u64, QueueError> {
        OcrJobRepo::purge_expired(&self.pool, retention)
            .await
            .map_err(QueueError::backend)
    }

    async fn count_by_state(&self) -> Result<Vec<(JobState, i64)>, QueueError> {
        let rows = OcrJobRepo::count_by_state(&self.pool)
            .await
            .map_err(QueueError::backend)?;
        Ok(rows
            .into_iter()
            .filter_map(|(id, count)| {
                let state = JobState::from_id(id);
                if state.is_none() {
                    tracing::warn!(state_id = id, "Ignoring unknown OCR job state");
                }
                state.map(|s| (s, count))
            })
            .collect())
    }
}
