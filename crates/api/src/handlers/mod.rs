//! HTTP request handlers.

pub mod analyze;
pub mod email;
pub mod health;
pub mod images;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use validator::Validate;

use imgocr_core::error::CoreError;
use imgocr_core::types::DbId;

use crate::error::{AppError, AppResult};

/// Parse an id taken from the URL path.
pub(crate) fn parse_id(raw: &str) -> Result<DbId, AppError> {
    raw.parse::<DbId>()
        .map_err(|_| AppError::Core(CoreError::Validation(format!("Invalid id '{raw}'"))))
}

/// Turn a JSON extractor rejection into the service's error body.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Run `validator` rules and report them as a validation error.
pub(crate) fn validated<T: Validate>(body: T) -> AppResult<T> {
    body.validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;
    Ok(body)
}
