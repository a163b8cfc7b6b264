//! Image record model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use imgocr_core::types::{DbId, Timestamp};

/// A row from the `images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImageRecord {
    pub id: DbId,
    pub title: String,
    /// Path of the binary relative to the media root.
    pub storage_ref: String,
    pub uploaded_at: Timestamp,
    pub size_bytes: i64,
    pub width: i32,
    pub height: i32,
    pub format: String,
}

/// DTO for inserting a new image record. Attributes are derived by the caller.
#[derive(Debug, Clone)]
pub struct CreateImage {
    pub title: String,
    pub storage_ref: String,
    pub size_bytes: i64,
    pub width: i32,
    pub height: i32,
    pub format: String,
}
