//! OCR job submission and status.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use imgocr_core::error::CoreError;
use imgocr_core::job::{DeliveryPreference, JobId, OcrJobResult};
use imgocr_core::status::JobState;
use imgocr_pipeline::submit_job;

use crate::error::AppResult;
use crate::handlers::{json_body, parse_id, validated};
use crate::state::OcrState;

fn default_send_email() -> bool {
    true
}

/// Body of `POST /analyze`.
#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[serde(alias = "imageId")]
    pub image_id: String,
    #[serde(default = "default_send_email", alias = "sendEmail")]
    pub send_email: bool,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub task_id: JobId,
    pub status: &'static str,
    pub message: &'static str,
}

/// Body of `GET /task_status/{task_id}`.
#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    pub task_id: JobId,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OcrJobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /analyze
///
/// Queues an OCR job and returns its id immediately. The image is not looked
/// up here; an unknown id surfaces later as a failed job.
pub async fn analyze(
    State(state): State<OcrState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AnalyzeResponse>)> {
    let request = validated(json_body(payload)?)?;
    let image_id = request.image_id.trim().parse().map_err(|_| {
        CoreError::Validation(format!("image_id '{}' is not a valid UUID", request.image_id))
    })?;

    let delivery = DeliveryPreference {
        send_email: request.send_email,
        email: request.email,
    };
    let job = submit_job(state.queue.as_ref(), image_id, delivery).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AnalyzeResponse {
            task_id: job.id,
            status: "processing",
            message: "Image analysis started",
        }),
    ))
}

/// GET /task_status/{task_id}
///
/// Unknown and expired ids report `PENDING`, matching a result backend that
/// cannot tell "not started" from "never existed".
pub async fn task_status(
    State(state): State<OcrState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<TaskStatusResponse>> {
    let task_id = parse_id(&task_id)?;

    let response = match state.queue.find(task_id).await? {
        None => TaskStatusResponse {
            task_id,
            state: JobState::Pending.wire_name(),
            result: None,
            error: None,
        },
        Some(job) => TaskStatusResponse {
            task_id,
            state: job.state.wire_name(),
            result: job.result.filter(|_| job.state == JobState::Succeeded),
            error: job.error_message.filter(|_| job.state == JobState::Failed),
        },
    };

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_camel_case_aliases_and_defaults() {
        let req: AnalyzeRequest =
            serde_json::from_str(r#"{"imageId": "abc", "email": "a@example.com"}"#).unwrap();
        assert_eq!(req.image_id, "abc");
        assert!(req.send_email);

        let req: AnalyzeRequest =
            serde_json::from_str(r#"{"image_id": "abc", "sendEmail": false}"#).unwrap();
        assert!(!req.send_email);
        assert!(req.email.is_none());
    }

    #[test]
    fn rejects_malformed_email() {
        let req = AnalyzeRequest {
            image_id: "x".into(),
            send_email: true,
            email: Some("not-an-address".into()),
        };
        assert!(validated(req).is_err());
    }
}
