//! Ad-hoc email endpoint of the OCR service.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use imgocr_core::types::DbId;

use crate::error::AppResult;
use crate::handlers::{json_body, validated};
use crate::state::OcrState;

/// Body of `POST /send_message_to_email`.
#[derive(Debug, Deserialize, Validate)]
pub struct SendEmailRequest {
    #[serde(alias = "toEmail")]
    #[validate(email)]
    pub to_email: String,
    pub subject: String,
    pub body: String,
    #[serde(default, alias = "imageId")]
    pub image_id: Option<String>,
    #[serde(default, alias = "ocrText")]
    pub ocr_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub success: bool,
    pub message: String,
}

/// Append the OCR section when an image and its text are both given.
///
/// Metadata lookup failures are logged and the body is sent unchanged.
async fn compose_body(state: &OcrState, request: &SendEmailRequest) -> String {
    let mut body = request.body.clone();

    let (Some(raw_id), Some(ocr_text)) = (&request.image_id, &request.ocr_text) else {
        return body;
    };
    let Ok(image_id) = raw_id.trim().parse::<DbId>() else {
        tracing::warn!(image_id = %raw_id, "Ignoring malformed image id in email request");
        return body;
    };

    match state.gateway.fetch_image_metadata(image_id).await {
        Ok(meta) => {
            body.push_str(&format!("\n\nOCR Results for {}:\n{ocr_text}", meta.title));
        }
        Err(e) => {
            tracing::warn!(%image_id, error = %e, "Could not load image metadata for email");
        }
    }
    body
}

/// POST /send_message_to_email
///
/// Delivery problems are reported in the body with `success: false`.
pub async fn send_message_to_email(
    State(state): State<OcrState>,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> AppResult<Json<SendEmailResponse>> {
    let request = validated(json_body(payload)?)?;
    let body = compose_body(&state, &request).await;

    let response = match state
        .notifier
        .send(&request.to_email, &request.subject, &body)
        .await
    {
        Ok(()) => {
            tracing::info!(to = %request.to_email, "Ad-hoc email sent");
            SendEmailResponse {
                success: true,
                message: "Email sent successfully".to_string(),
            }
        }
        Err(e) => {
            tracing::warn!(to = %request.to_email, error = %e, "Ad-hoc email failed");
            SendEmailResponse {
                success: false,
                message: format!("Failed to send email: {e}"),
            }
        }
    };
    Ok(Json(response))
}
