//! OCR job row and its mapping onto [`imgocr_core::job::OcrJob`].

use sqlx::FromRow;
use imgocr_core::job::{DeliveryPreference, OcrJob, OcrJobResult, QueueError};
use imgocr_core::status::{JobState, StatusId};
use imgocr_core::types::{DbId, Timestamp};

/// A row from the `ocr_jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct OcrJobRow {
    pub id: DbId,
    pub image_id: DbId,
    pub send_email: bool,
    pub email: Option<String>,
    pub state_id: StatusId,
    pub attempt: i32,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub submitted_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl TryFrom<OcrJobRow> for OcrJob {
    type Error = QueueError;

    fn try_from(row: OcrJobRow) -> Result<Self, Self::Error> {
        let state = JobState::from_id(row.state_id).ok_or_else(|| QueueError::Corrupt {
            id: row.id,
            reason: format!("unknown state_id {}", row.state_id),
        })?;

        let result = row
            .result
            .map(serde_json::from_value::<OcrJobResult>)
            .transpose()
            .map_err(|e| QueueError::Corrupt {
                id: row.id,
                reason: format!("result payload: {e}"),
            })?;

        Ok(OcrJob {
            id: row.id,
            image_id: row.image_id,
            delivery: DeliveryPreference {
                send_email: row.send_email,
                email: row.email,
            },
            state,
            attempt: row.attempt,
            result,
            error_message: row.error_message,
            submitted_at: row.submitted_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}
