//! Repository for the `ocr_jobs` table.
//!
//! Every state-changing statement is guarded by `state_id IN (pending,
//! running)` so terminal jobs are never modified.

use std::time::Duration;

use sqlx::PgPool;
use imgocr_core::job::{NewOcrJob, OcrJobResult};
use imgocr_core::status::{JobState, StatusId};
use imgocr_core::types::DbId;

use crate::models::ocr_job::OcrJobRow;

/// Column list for `ocr_jobs` queries.
const COLUMNS: &str = "\
    id, image_id, send_email, email, state_id, attempt, result, error_message, \
    submitted_at, claimed_at, started_at, completed_at";

/// Non-terminal states: pending, running.
const ACTIVE_STATES: [StatusId; 2] = [JobState::Pending as StatusId, JobState::Running as StatusId];

/// Terminal states: succeeded, failed.
const TERMINAL_STATES: [StatusId; 2] = [
    JobState::Succeeded as StatusId,
    JobState::Failed as StatusId,
];

/// Provides queue operations for OCR jobs.
pub struct OcrJobRepo;

impl OcrJobRepo {
    /// Insert a new pending job.
    pub async fn enqueue(pool: &PgPool, input: &NewOcrJob) -> Result<OcrJobRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO ocr_jobs (image_id, send_email, email, state_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OcrJobRow>(&query)
            .bind(input.image_id)
            .bind(input.delivery.send_email)
            .bind(&input.delivery.email)
            .bind(JobState::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest pending job.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// claim the same row.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<OcrJobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE ocr_jobs \
             SET state_id = $1, claimed_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM ocr_jobs \
                 WHERE state_id = $2 \
                 ORDER BY submitted_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OcrJobRow>(&query)
            .bind(JobState::Running.id())
            .bind(JobState::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Find a job by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<OcrJobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM ocr_jobs WHERE id = $1");
        sqlx::query_as::<_, OcrJobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Record the start of an attempt and renew the claim.
    ///
    /// The `attempt = $3 - 1` guard fences off a worker whose claim expired
    /// and was picked up by another worker.
    pub async fn mark_running(pool: &PgPool, id: DbId, attempt: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ocr_jobs \
             SET state_id = $2, attempt = $3, claimed_at = NOW(), \
                 started_at = COALESCE(started_at, NOW()) \
             WHERE id = $1 AND state_id IN ($4, $5) AND attempt = $3 - 1",
        )
        .bind(id)
        .bind(JobState::Running.id())
        .bind(attempt)
        .bind(ACTIVE_STATES[0])
        .bind(ACTIVE_STATES[1])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Keep the error of a retried attempt on an active job.
    pub async fn record_attempt_error(
        pool: &PgPool,
        id: DbId,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE ocr_jobs SET error_message = $2 \
             WHERE id = $1 AND state_id IN ($3, $4)",
        )
        .bind(id)
        .bind(error)
        .bind(ACTIVE_STATES[0])
        .bind(ACTIVE_STATES[1])
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Return a running job at `attempt` to pending.
    pub async fn release(pool: &PgPool, id: DbId, attempt: i32) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE ocr_jobs SET state_id = $2, claimed_at = NULL \
             WHERE id = $1 AND state_id = $3 AND attempt = $4",
        )
        .bind(id)
        .bind(JobState::Pending.id())
        .bind(JobState::Running.id())
        .bind(attempt)
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Store the result payload and mark the job succeeded.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        result: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE ocr_jobs \
             SET state_id = $2, result = $3, error_message = NULL, completed_at = NOW() \
             WHERE id = $1 AND state_id IN ($4, $5)",
        )
        .bind(id)
        .bind(JobState::Succeeded.id())
        .bind(result)
        .bind(ACTIVE_STATES[0])
        .bind(ACTIVE_STATES[1])
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Mark the job failed with the causing error.
    pub async fn fail(pool: &PgPool, id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE ocr_jobs \
             SET state_id = $2, error_message = $3, completed_at = NOW() \
             WHERE id = $1 AND state_id IN ($4, $5)",
        )
        .bind(id)
        .bind(JobState::Failed.id())
        .bind(error)
        .bind(ACTIVE_STATES[0])
        .bind(ACTIVE_STATES[1])
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Return running jobs whose claim is older than `lease` to pending.
    pub async fn requeue_stale(pool: &PgPool, lease: Duration) -> Result<u64, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE ocr_jobs \
             SET state_id = $1, claimed_at = NULL \
             WHERE state_id = $2 \
               AND claimed_at < NOW() - make_interval(secs => $3)",
        )
        .bind(JobState::Pending.id())
        .bind(JobState::Running.id())
        .bind(lease.as_secs_f64())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected())
    }

    /// Delete terminal jobs completed more than `retention` ago.
    pub async fn purge_expired(pool: &PgPool, retention: Duration) -> Result<u64, sqlx::Error> {
        let outcome = sqlx::query(
            "DELETE FROM ocr_jobs \
             WHERE state_id IN ($1, $2) \
               AND completed_at < NOW() - make_interval(secs => $3)",
        )
        .bind(TERMINAL_STATES[0])
        .bind(TERMINAL_STATES[1])
        .bind(retention.as_secs_f64())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected())
    }

    /// Job count per state id.
    pub async fn count_by_state(pool: &PgPool) -> Result<Vec<(StatusId, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (StatusId, i64)>(
            "SELECT state_id, COUNT(*) FROM ocr_jobs GROUP BY state_id ORDER BY state_id",
        )
        .fetch_all(pool)
        .await
    }
}
