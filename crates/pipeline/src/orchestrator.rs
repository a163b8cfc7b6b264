//! Drives one OCR job from `Pending` to a terminal state.
//!
//! Steps run in strict order: fetch metadata, download, OCR, optional email,
//! persist. Transient failures are retried in-process under a fixed backoff;
//! the persisted attempt counter seeds the loop so a redelivered job keeps
//! whatever budget it had left. A worker that is shut down during the
//! backoff hands the job back to the queue.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use imgocr_core::gateway::{GatewayError, ImageMetadata};
use imgocr_core::job::{
    DeliveryPreference, JobId, JobQueue, NewOcrJob, OcrJob, OcrJobResult, QueueError,
    RESULT_STATUS_COMPLETED,
};
use imgocr_core::ocr::{OcrError, OcrOutput};
use imgocr_core::retry::RetryPolicy;
use imgocr_core::status::JobState;
use imgocr_core::types::DbId;

use crate::services::Services;

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

/// Failure of one pipeline attempt.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Image {0} has no file attached")]
    MissingImageUrl(DbId),

    #[error(transparent)]
    Ocr(#[from] OcrError),
}

impl JobError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            JobError::Gateway(e) => e.is_transient(),
            JobError::MissingImageUrl(_) => false,
            JobError::Ocr(_) => true,
        }
    }
}

/// What [`Orchestrator::execute`] did with a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded(OcrJobResult),
    Failed { error: String, attempts: i32 },
    /// Missing, already terminal, or taken over by another worker.
    Skipped,
    /// Shutdown interrupted the retry backoff; the job is `Pending` again.
    Released { attempts: i32 },
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Enqueue a new `Pending` job and return it.
///
/// No image existence check is made; an unknown image fails the job later.
pub async fn submit_job(
    queue: &dyn JobQueue,
    image_id: DbId,
    delivery: DeliveryPreference,
) -> Result<OcrJob, QueueError> {
    let job = queue.enqueue(&NewOcrJob { image_id, delivery }).await?;
    tracing::info!(task_id = %job.id, %image_id, "OCR job submitted");
    Ok(job)
}

pub struct Orchestrator {
    queue: Arc<dyn JobQueue>,
    services: Services,
    retry: RetryPolicy,
    default_email: Option<String>,
}

impl Orchestrator {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        services: Services,
        retry: RetryPolicy,
        default_email: Option<String>,
    ) -> Self {
        Self {
            queue,
            services,
            retry,
            default_email,
        }
    }

    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    /// Enqueue a new job on this orchestrator's queue.
    pub async fn submit(
        &self,
        image_id: DbId,
        delivery: DeliveryPreference,
    ) -> Result<OcrJob, QueueError> {
        submit_job(self.queue.as_ref(), image_id, delivery).await
    }

    /// Run the pipeline for `job_id` until it reaches a terminal state.
    ///
    /// Missing and terminal jobs are skipped, so redelivery never repeats
    /// side effects of a finished job.
    pub async fn execute(&self, job_id: JobId) -> Result<JobOutcome, QueueError> {
        self.execute_until(job_id, &CancellationToken::new()).await
    }

    /// Like [`execute`](Self::execute), but a cancelled `cancel` ends the
    /// retry backoff early and releases the job back to the queue.
    pub async fn execute_until(
        &self,
        job_id: JobId,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, QueueError> {
        let job = match self.queue.find(job_id).await? {
            Some(job) if !job.state.is_terminal() => job,
            Some(job) => {
                tracing::info!(task_id = %job_id, state = job.state.label(), "Job already finished, skipping");
                return Ok(JobOutcome::Skipped);
            }
            None => {
                tracing::warn!(task_id = %job_id, "Job not found, skipping");
                return Ok(JobOutcome::Skipped);
            }
        };

        let mut attempt = job.attempt;
        if !self.retry.allows_another(attempt) {
            let error = match job.error_message.as_deref() {
                Some(last) => format!("Retry budget exhausted after {attempt} attempts; last error: {last}"),
                None => format!("Retry budget exhausted after {attempt} attempts"),
            };
            return self.record_failure(job_id, error, attempt).await;
        }

        let (metadata, output) = loop {
            attempt += 1;
            if !self.queue.mark_running(job_id, attempt).await? {
                tracing::info!(task_id = %job_id, attempt, "Job moved on elsewhere, skipping");
                return Ok(JobOutcome::Skipped);
            }
            tracing::info!(task_id = %job_id, image_id = %job.image_id, attempt, "Processing OCR job");

            match self.run_attempt(job.image_id).await {
                Ok(done) => break done,
                Err(e) if e.is_transient() && self.retry.allows_another(attempt) => {
                    tracing::warn!(
                        task_id = %job_id,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        retry_in_secs = self.retry.delay.as_secs(),
                        error = %e,
                        "OCR attempt failed, retrying",
                    );
                    self.queue.record_attempt_error(job_id, &e.to_string()).await?;

                    tokio::select! {
                        _ = cancel.cancelled() => {
                            let released = self.queue.release(job_id, attempt).await?;
                            tracing::info!(task_id = %job_id, attempt, released, "Shutdown during backoff, job handed back");
                            return Ok(JobOutcome::Released { attempts: attempt });
                        }
                        _ = tokio::time::sleep(self.retry.delay) => {}
                    }
                }
                Err(e) => {
                    tracing::error!(task_id = %job_id, attempt, error = %e, "OCR job failed");
                    return self.record_failure(job_id, e.to_string(), attempt).await;
                }
            }
        };

        if !self.still_owned(job_id, attempt).await? {
            tracing::warn!(task_id = %job_id, attempt, "Claim lost during attempt, result dropped");
            return Ok(JobOutcome::Skipped);
        }

        let (email_sent, warning) = self.deliver(&job, &metadata, &output).await;

        let result = OcrJobResult {
            task_id: job_id,
            image_id: job.image_id,
            status: RESULT_STATUS_COMPLETED.to_string(),
            text: output.text,
            confidence: output.confidence,
            email_sent,
            warning,
        };

        if !self.queue.complete(job_id, &result).await? {
            tracing::warn!(task_id = %job_id, "Job reached a terminal state elsewhere, result dropped");
        } else {
            tracing::info!(
                task_id = %job_id,
                attempt,
                confidence = result.confidence,
                email_sent,
                "OCR job succeeded",
            );
        }
        Ok(JobOutcome::Succeeded(result))
    }

    /// Whether this worker's attempt is still the job's current one.
    async fn still_owned(&self, job_id: JobId, attempt: i32) -> Result<bool, QueueError> {
        Ok(self
            .queue
            .find(job_id)
            .await?
            .is_some_and(|j| j.state == JobState::Running && j.attempt == attempt))
    }

    /// Fetch metadata, download the binary and run OCR.
    async fn run_attempt(&self, image_id: DbId) -> Result<(ImageMetadata, OcrOutput), JobError> {
        let metadata = self.services.gateway.fetch_image_metadata(image_id).await?;
        let url = metadata
            .image_url
            .as_deref()
            .ok_or(JobError::MissingImageUrl(image_id))?;
        let bytes = self.services.gateway.fetch_image_bytes(url).await?;
        let output = self.services.ocr.extract(&bytes).await?;
        Ok((metadata, output))
    }

    /// Send the result email if requested. Never fails the job.
    async fn deliver(
        &self,
        job: &OcrJob,
        metadata: &ImageMetadata,
        output: &OcrOutput,
    ) -> (bool, Option<String>) {
        if !job.delivery.send_email {
            return (false, None);
        }

        let Some(to) = job
            .delivery
            .email
            .as_deref()
            .or(self.default_email.as_deref())
        else {
            tracing::warn!(task_id = %job.id, "Email requested but no recipient configured");
            return (false, Some("Email not sent: no recipient configured".to_string()));
        };

        match self
            .services
            .notifier
            .send_ocr_result(to, metadata, &output.text, output.confidence)
            .await
        {
            Ok(()) => (true, None),
            Err(e) => {
                tracing::warn!(task_id = %job.id, to, error = %e, "OCR result email not delivered");
                (false, Some(format!("Email not sent: {e}")))
            }
        }
    }

    async fn record_failure(
        &self,
        job_id: JobId,
        error: String,
        attempts: i32,
    ) -> Result<JobOutcome, QueueError> {
        if !self.queue.fail(job_id, &error).await? {
            return Ok(JobOutcome::Skipped);
        }
        Ok(JobOutcome::Failed { error, attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(JobError::Gateway(GatewayError::UpstreamUnavailable("x".into())).is_transient());
        assert!(JobError::Ocr(OcrError::Processing("x".into())).is_transient());
        assert!(!JobError::Gateway(GatewayError::ImageNotFound(DbId::nil())).is_transient());
        assert!(!JobError::MissingImageUrl(DbId::nil()).is_transient());
    }

    #[test]
    fn not_found_message_names_the_image() {
        let id = DbId::nil();
        let err = JobError::from(GatewayError::ImageNotFound(id));
        assert_eq!(err.to_string(), format!("Image with id {id} not found"));
    }
}
