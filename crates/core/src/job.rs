//! OCR job model and the durable work queue port.
//!
//! A job is created `Pending` by the submission endpoint, claimed by exactly
//! one worker, and driven to `Succeeded` or `Failed` by the orchestrator.
//! Terminal jobs never change again; every state-changing operation on
//! [`JobQueue`] reports whether it actually applied.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::status::JobState;
use crate::types::{DbId, Timestamp};

/// Queue-assigned job identifier (the client-facing `task_id`).
pub type JobId = uuid::Uuid;

/// `status` value carried by every successful result payload.
pub const RESULT_STATUS_COMPLETED: &str = "completed";

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Whether and where to email the OCR result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPreference {
    pub send_email: bool,
    /// Explicit recipient. `None` falls back to the configured default.
    pub email: Option<String>,
}

/// Result payload persisted when a job succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrJobResult {
    pub task_id: JobId,
    pub image_id: DbId,
    pub status: String,
    pub text: String,
    pub confidence: f64,
    pub email_sent: bool,
    /// Set when the optional email step did not deliver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// A job as stored in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrJob {
    pub id: JobId,
    pub image_id: DbId,
    pub delivery: DeliveryPreference,
    pub state: JobState,
    /// Pipeline attempts started so far.
    pub attempt: i32,
    pub result: Option<OcrJobResult>,
    pub error_message: Option<String>,
    pub submitted_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// Input for [`JobQueue::enqueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOcrJob {
    pub image_id: DbId,
    pub delivery: DeliveryPreference,
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for queue backends.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The storage behind the queue failed (connection, query, etc.).
    #[error("Queue backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stored job could not be mapped back into the domain model.
    #[error("Corrupt job record {id}: {reason}")]
    Corrupt { id: JobId, reason: String },
}

impl QueueError {
    /// Wrap any backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// Durable, at-least-once work queue for OCR jobs.
///
/// Implementations must guarantee that a job handed out by
/// [`claim_next`](JobQueue::claim_next) is not handed to a second worker
/// until it is released by [`release`](JobQueue::release) or
/// [`requeue_stale`](JobQueue::requeue_stale).
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Store a new `Pending` job and return it with its assigned id.
    async fn enqueue(&self, job: &NewOcrJob) -> Result<OcrJob, QueueError>;

    /// Atomically claim the oldest pending job, moving it to `Running`.
    async fn claim_next(&self) -> Result<Option<OcrJob>, QueueError>;

    /// Look a job up by id. Expired jobs may already be gone.
    async fn find(&self, id: JobId) -> Result<Option<OcrJob>, QueueError>;

    /// Record the start of pipeline attempt `attempt`.
    ///
    /// Applies only while the stored counter is `attempt - 1`, so a worker
    /// whose claim was taken over cannot start another attempt. Returns
    /// `false` (and changes nothing) if the job is terminal, missing, or its
    /// counter has moved on.
    async fn mark_running(&self, id: JobId, attempt: i32) -> Result<bool, QueueError>;

    /// Keep the error of an attempt that will be retried, so a later failure
    /// can still report it.
    ///
    /// Returns `false` if the job was already terminal or missing.
    async fn record_attempt_error(&self, id: JobId, error: &str) -> Result<bool, QueueError>;

    /// Hand a `Running` job at `attempt` back to `Pending`, keeping its
    /// attempt counter, when its worker stops before finishing it.
    ///
    /// Returns `false` if the job is no longer running at that attempt.
    async fn release(&self, id: JobId, attempt: i32) -> Result<bool, QueueError>;

    /// Store the result and move the job to `Succeeded`.
    ///
    /// Returns `false` if the job was already terminal or missing.
    async fn complete(&self, id: JobId, result: &OcrJobResult) -> Result<bool, QueueError>;

    /// Record the causing error and move the job to `Failed`.
    ///
    /// Returns `false` if the job was already terminal or missing.
    async fn fail(&self, id: JobId, error: &str) -> Result<bool, QueueError>;

    /// Return `Running` jobs claimed longer than `lease` ago to `Pending`.
    async fn requeue_stale(&self, lease: Duration) -> Result<u64, QueueError>;

    /// Delete terminal jobs completed longer than `retention` ago.
    async fn purge_expired(&self, retention: Duration) -> Result<u64, QueueError>;

    /// Number of stored jobs per state (states with no jobs may be omitted).
    async fn count_by_state(&self) -> Result<Vec<(JobState, i64)>, QueueError>;
}
