//! Pool of workers pulling OCR jobs from the shared queue.
//!
//! Each worker is a Tokio task that claims one job at a time and runs it
//! through the [`Orchestrator`]. Idle workers poll every `poll_interval`.
//! On cancellation workers stop claiming. A job in progress runs to
//! completion unless it is waiting out a retry backoff, in which case it is
//! handed back to the queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::orchestrator::{JobOutcome, Orchestrator};

pub struct WorkerPool {
    orchestrator: Arc<Orchestrator>,
    concurrency: usize,
    poll_interval: Duration,
}

impl WorkerPool {
    pub fn new(orchestrator: Arc<Orchestrator>, concurrency: usize, poll_interval: Duration) -> Self {
        Self {
            orchestrator,
            concurrency: concurrency.max(1),
            poll_interval,
        }
    }

    /// Run all workers until `cancel` fires and every worker has stopped.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            concurrency = self.concurrency,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Worker pool started",
        );

        let mut workers = JoinSet::new();
        for worker in 0..self.concurrency {
            let orchestrator = Arc::clone(&self.orchestrator);
            let cancel = cancel.clone();
            let poll_interval = self.poll_interval;
            workers.spawn(async move { work_loop(worker, orchestrator, poll_interval, cancel).await });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Worker task panicked");
            }
        }
        tracing::info!("Worker pool stopped");
    }
}

async fn work_loop(
    worker: usize,
    orchestrator: Arc<Orchestrator>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    tracing::debug!(worker, "Worker started");

    while !cancel.is_cancelled() {
        let claimed = orchestrator.queue().claim_next().await;
        match claimed {
            Ok(Some(job)) => {
                tracing::info!(worker, task_id = %job.id, "Job claimed");
                match orchestrator.execute_until(job.id, &cancel).await {
                    Ok(JobOutcome::Succeeded(_)) | Ok(JobOutcome::Skipped) => {}
                    Ok(JobOutcome::Released { attempts }) => {
                        tracing::info!(worker, task_id = %job.id, attempts, "Job released on shutdown");
                    }
                    Ok(JobOutcome::Failed { error, attempts }) => {
                        tracing::debug!(worker, task_id = %job.id, attempts, error = %error, "Job failed");
                    }
                    Err(e) => {
                        tracing::error!(worker, task_id = %job.id, error = %e, "Queue error while executing job");
                    }
                }
                continue;
            }
            Ok(None) => {}
            Err(e) => tracing::error!(worker, error = %e, "Failed to claim job"),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    tracing::debug!(worker, "Worker stopped");
}
