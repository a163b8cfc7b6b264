//! Repository for the `images` table.

use sqlx::PgPool;
use imgocr_core::types::DbId;

use crate::models::image::{CreateImage, ImageRecord};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, storage_ref, uploaded_at, size_bytes, width, height, format";

/// Provides create/read/delete operations for image records.
pub struct ImageRepo;

impl ImageRepo {
    /// Insert a new image record, returning the created row.
    ///
    /// `id` and `uploaded_at` are assigned by the database.
    pub async fn create(pool: &PgPool, input: &CreateImage) -> Result<ImageRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO images (title, storage_ref, size_bytes, width, height, format)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImageRecord>(&query)
            .bind(&input.title)
            .bind(&input.storage_ref)
            .bind(input.size_bytes)
            .bind(input.width)
            .bind(input.height)
            .bind(&input.format)
            .fetch_one(pool)
            .await
    }

    /// Find an image by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImageRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE id = $1");
        sqlx::query_as::<_, ImageRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every image, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<ImageRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images ORDER BY uploaded_at DESC, id");
        sqlx::query_as::<_, ImageRecord>(&query)
            .fetch_all(pool)
            .await
    }

    /// Delete an image record. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
