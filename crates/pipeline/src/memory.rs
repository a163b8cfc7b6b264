//! In-process [`JobQueue`] for tests and single-process development.
//!
//! Same contract as the Postgres queue: FIFO claims, one claimant per job,
//! terminal jobs never change.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use imgocr_core::job::{JobId, JobQueue, NewOcrJob, OcrJob, OcrJobResult, QueueError};
use imgocr_core::status::JobState;
use imgocr_core::types::Timestamp;

struct Entry {
    seq: u64,
    job: OcrJob,
    claimed_at: Option<Timestamp>,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    jobs: HashMap<JobId, Entry>,
}

#[derive(Default)]
pub struct MemoryJobQueue {
    inner: Mutex<Inner>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, QueueError> {
        self.inner
            .lock()
            .map_err(|_| QueueError::Backend("memory queue lock poisoned".into()))
    }

    /// Apply `f` to an active job. Returns `false` for missing or terminal jobs.
    fn update_active(
        &self,
        id: JobId,
        f: impl FnOnce(&mut Entry),
    ) -> Result<bool, QueueError> {
        let mut inner = self.lock()?;
        match inner.jobs.get_mut(&id) {
            Some(entry) if !entry.job.state.is_terminal() => {
                f(entry);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn elapsed_since(ts: Timestamp) -> Duration {
    (Utc::now() - ts).to_std().unwrap_or(Duration::ZERO)
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: &NewOcrJob) -> Result<OcrJob, QueueError> {
        let mut inner = self.lock()?;
        let stored = OcrJob {
            id: JobId::new_v4(),
            image_id: job.image_id,
            delivery: job.delivery.clone(),
            state: JobState::Pending,
            attempt: 0,
            result: None,
            error_message: None,
            submitted_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(
            stored.id,
            Entry {
                seq,
                job: stored.clone(),
                claimed_at: None,
            },
        );
        Ok(stored)
    }

    async fn claim_next(&self) -> Result<Option<OcrJob>, QueueError> {
        let mut inner = self.lock()?;
        let next = inner
            .jobs
            .values_mut()
            .filter(|e| e.job.state == JobState::Pending)
            .min_by_key(|e| e.seq);
        Ok(next.map(|entry| {
            entry.job.state = JobState::Running;
            entry.claimed_at = Some(Utc::now());
            entry.job.clone()
        }))
    }

    async fn find(&self, id: JobId) -> Result<Option<OcrJob>, QueueError> {
        Ok(self.lock()?.jobs.get(&id).map(|e| e.job.clone()))
    }

    async fn mark_running(&self, id: JobId, attempt: i32) -> Result<bool, QueueError> {
        let mut inner = self.lock()?;
        match inner.jobs.get_mut(&id) {
            Some(entry) if !entry.job.state.is_terminal() && entry.job.attempt == attempt - 1 => {
                let now = Utc::now();
                entry.job.state = JobState::Running;
                entry.job.attempt = attempt;
                entry.job.started_at.get_or_insert(now);
                entry.claimed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_attempt_error(&self, id: JobId, error: &str) -> Result<bool, QueueError> {
        self.update_active(id, |entry| {
            entry.job.error_message = Some(error.to_string());
        })
    }

    async fn release(&self, id: JobId, attempt: i32) -> Result<bool, QueueError> {
        let mut inner = self.lock()?;
        match inner.jobs.get_mut(&id) {
            Some(entry) if entry.job.state == JobState::Running && entry.job.attempt == attempt => {
                entry.job.state = JobState::Pending;
                entry.claimed_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(&self, id: JobId, result: &OcrJobResult) -> Result<bool, QueueError> {
        self.update_active(id, |entry| {
            entry.job.state = JobState::Succeeded;
            entry.job.result = Some(result.clone());
            entry.job.error_message = None;
            entry.job.completed_at = Some(Utc::now());
        })
    }

    async fn fail(&self, id: JobId, error: &str) -> Result<bool, QueueError> {
        self.update_active(id, |entry| {
            entry.job.state = JobState::Failed;
            entry.job.error_message = Some(error.to_string());
            entry.job.completed_at = Some(Utc::now());
        })
    }

    async fn requeue_stale(&self, lease: Duration) -> Result<u64, QueueError> {
        let mut inner = self.lock()?;
        let mut requeued = 0;
        for entry in inner.jobs.values_mut() {
            let stale = entry.job.state == JobState::Running
                && entry.claimed_at.is_some_and(|at| elapsed_since(at) >= lease);
            if stale {
                entry.job.state = JobState::Pending;
                entry.claimed_at = None;
                requeued += 1;
            }
        }
        Ok(requeued)
    }

    async fn purge_expired(&self, retention: Duration) -> Result<u64, QueueError> {
        let mut inner = self.lock()?;
        let before = inner.jobs.len();
        inner.jobs.retain(|_, entry| {
            !(entry.job.state.is_terminal()
                && entry
                    .job
                    .completed_at
                    .is_some_and(|at| elapsed_since(at) >= retention))
        });
        Ok((before - inner.jobs.len()) as u64)
    }

    async fn count_by_state(&self) -> Result<Vec<(JobState, i64)>, QueueError> {
        let inner = self.lock()?;
        Ok(JobState::ALL
            .iter()
            .filter_map(|state| {
                let count = inner.jobs.values().filter(|e| e.job.state == *state).count() as i64;
                (count > 0).then_some((*state, count))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgocr_core::job::DeliveryPreference;
    use imgocr_core::types::DbId;

    fn new_job() -> NewOcrJob {
        NewOcrJob {
            image_id: DbId::new_v4(),
            delivery: DeliveryPreference::default(),
        }
    }

    #[tokio::test]
    async fn claims_in_submission_order() {
        let queue = MemoryJobQueue::new();
        let a = queue.enqueue(&new_job()).await.unwrap();
        let b = queue.enqueue(&new_job()).await.unwrap();

        assert_eq!(queue.claim_next().await.unwrap().unwrap().id, a.id);
        assert_eq!(queue.claim_next().await.unwrap().unwrap().id, b.id);
        assert!(queue.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn terminal_jobs_do_not_change() {
        let queue = MemoryJobQueue::new();
        let job = queue.enqueue(&new_job()).await.unwrap();
        assert!(queue.fail(job.id, "boom").await.unwrap());
        assert!(!queue.mark_running(job.id, 2).await.unwrap());
        assert!(!queue.fail(job.id, "again").await.unwrap());

        let stored = queue.find(job.id).await.unwrap().unwrap();
        assert_eq!(stored.state, JobState::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn attempt_counter_fences_a_taken_over_claim() {
        let queue = MemoryJobQueue::new();
        let job = queue.enqueue(&new_job()).await.unwrap();
        queue.claim_next().await.unwrap();
        assert!(queue.mark_running(job.id, 1).await.unwrap());

        // Lease expires; a second worker claims the job and starts attempt 2.
        queue.requeue_stale(Duration::ZERO).await.unwrap();
        queue.claim_next().await.unwrap().unwrap();
        assert!(queue.mark_running(job.id, 2).await.unwrap());

        // The first worker's retry is refused.
        assert!(!queue.mark_running(job.id, 2).await.unwrap());
        assert_eq!(queue.find(job.id).await.unwrap().unwrap().attempt, 2);
    }

    #[tokio::test]
    async fn release_returns_job_to_pending_with_its_attempts() {
        let queue = MemoryJobQueue::new();
        let job = queue.enqueue(&new_job()).await.unwrap();
        queue.claim_next().await.unwrap();
        queue.mark_running(job.id, 1).await.unwrap();
        queue.record_attempt_error(job.id, "timeout").await.unwrap();

        assert!(!queue.release(job.id, 2).await.unwrap());
        assert!(queue.release(job.id, 1).await.unwrap());

        let stored = queue.find(job.id).await.unwrap().unwrap();
        assert_eq!(stored.state, JobState::Pending);
        assert_eq!(stored.attempt, 1);
        assert_eq!(stored.error_message.as_deref(), Some("timeout"));
        assert_eq!(queue.claim_next().await.unwrap().unwrap().id, job.id);
    }

    #[tokio::test]
    async fn zero_lease_requeues_running_jobs() {
        let queue = MemoryJobQueue::new();
        let job = queue.enqueue(&new_job()).await.unwrap();
        queue.claim_next().await.unwrap();

        assert_eq!(queue.requeue_stale(Duration::from_secs(3600)).await.unwrap(), 0);
        assert_eq!(queue.requeue_stale(Duration::ZERO).await.unwrap(), 1);
        assert_eq!(queue.claim_next().await.unwrap().unwrap().id, job.id);
    }

    #[tokio::test]
    async fn purge_only_touches_terminal_jobs() {
        let queue = MemoryJobQueue::new();
        let done = queue.enqueue(&new_job()).await.unwrap();
        let waiting = queue.enqueue(&new_job()).await.unwrap();
        queue.fail(done.id, "x").await.unwrap();

        assert_eq!(queue.purge_expired(Duration::ZERO).await.unwrap(), 1);
        assert!(queue.find(done.id).await.unwrap().is_none());
        assert!(queue.find(waiting.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn counts_by_state() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(&new_job()).await.unwrap();
        queue.enqueue(&new_job()).await.unwrap();
        queue.claim_next().await.unwrap();

        let counts = queue.count_by_state().await.unwrap();
        assert_eq!(counts, vec![(JobState::Pending, 1), (JobState::Running, 1)]);
    }
}
