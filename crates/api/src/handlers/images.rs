//! Handlers for `/api/images`.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use imgocr_core::error::CoreError;
use imgocr_core::gateway::ImageMetadata;
use imgocr_core::image_meta::{
    derive_attributes, file_size_mb, storage_ref_for, validate_format, validate_title,
};
use imgocr_core::types::{DbId, Timestamp};
use imgocr_db::models::image::{CreateImage, ImageRecord};
use imgocr_db::repositories::ImageRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::parse_id;
use crate::state::ImageState;

/// Image record as returned by the CRUD endpoints.
#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: DbId,
    pub title: String,
    pub image_url: String,
    pub uploaded_at: Timestamp,
    pub size: i64,
    pub width: i32,
    pub height: i32,
    pub format: String,
    pub file_size_mb: f64,
}

fn media_url(base: &str, storage_ref: &str) -> String {
    format!("{base}/media/{storage_ref}")
}

impl ImageResponse {
    fn from_record(record: ImageRecord, base_url: &str) -> Self {
        Self {
            image_url: media_url(base_url, &record.storage_ref),
            file_size_mb: file_size_mb(record.size_bytes),
            id: record.id,
            title: record.title,
            uploaded_at: record.uploaded_at,
            size: record.size_bytes,
            width: record.width,
            height: record.height,
            format: record.format,
        }
    }
}

fn to_metadata(record: ImageRecord, base_url: &str) -> ImageMetadata {
    ImageMetadata {
        image_url: Some(media_url(base_url, &record.storage_ref)),
        id: record.id,
        title: record.title,
        uploaded_at: record.uploaded_at,
        size: record.size_bytes,
        width: record.width,
        height: record.height,
        format: record.format,
    }
}

/// Cache-first lookup; misses are loaded from the database and cached
/// unless the cache was cleared while the row was being read.
async fn load_record(state: &ImageState, id: DbId) -> AppResult<ImageRecord> {
    if let Some(record) = state.cache.get(&id) {
        return Ok(record);
    }
    let generation = state.cache.generation();
    let record = ImageRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Image", id }))?;
    if !state.cache.insert_if_current(record.clone(), generation) {
        tracing::debug!(image_id = %id, "Cache cleared during load, not caching record");
    }
    Ok(record)
}

/// POST /api/images/
///
/// Multipart form with a required `title` text field and a required `image`
/// file field. The extension is checked before anything is stored.
pub async fn create_image(
    State(state): State<ImageState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ImageResponse>)> {
    let mut title: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                title = Some(text);
            }
            "image" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some((filename, data.to_vec()));
            }
            _ => {}
        }
    }

    let title = title.ok_or_else(|| CoreError::Validation("Missing required 'title' field".into()))?;
    let (filename, data) =
        file.ok_or_else(|| CoreError::Validation("Missing required 'image' field".into()))?;

    let format = validate_format(&filename)?;
    let title = validate_title(&title)?;
    let attrs = derive_attributes(&data, &format)?;
    if attrs.width == 0 && attrs.height == 0 {
        tracing::warn!(filename = %filename, "Could not read image dimensions, storing 0x0");
    }

    let storage_ref = storage_ref_for(&format, chrono::Utc::now());
    state.storage.save(&storage_ref, &data).await?;

    let input = CreateImage {
        title,
        storage_ref: storage_ref.clone(),
        size_bytes: attrs.size_bytes,
        width: attrs.width,
        height: attrs.height,
        format: attrs.format,
    };
    let record = match ImageRepo::create(&state.pool, &input).await {
        Ok(record) => record,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&storage_ref).await {
                tracing::error!(storage_ref = %storage_ref, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    state.cache.clear();
    tracing::info!(image_id = %record.id, size = record.size_bytes, format = %record.format, "Image uploaded");

    Ok((
        StatusCode::CREATED,
        Json(ImageResponse::from_record(record, &state.config.public_base_url)),
    ))
}

/// GET /api/images/ -- newest first.
pub async fn list_images(State(state): State<ImageState>) -> AppResult<Json<Vec<ImageResponse>>> {
    let base = &state.config.public_base_url;
    let records = ImageRepo::list(&state.pool).await?;
    Ok(Json(
        records
            .into_iter()
            .map(|r| ImageResponse::from_record(r, base))
            .collect(),
    ))
}

/// GET /api/images/{id}/
pub async fn get_image(
    State(state): State<ImageState>,
    Path(id): Path<String>,
) -> AppResult<Json<ImageResponse>> {
    let record = load_record(&state, parse_id(&id)?).await?;
    Ok(Json(ImageResponse::from_record(
        record,
        &state.config.public_base_url,
    )))
}

/// DELETE /api/images/{id}/ -- binary first, then the record.
pub async fn delete_image(
    State(state): State<ImageState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;
    let record = ImageRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Image", id }))?;

    state.storage.delete(&record.storage_ref).await?;
    let deleted = ImageRepo::delete(&state.pool, id).await?;
    state.cache.clear();

    if !deleted {
        return Err(CoreError::NotFound { entity: "Image", id }.into());
    }
    tracing::info!(image_id = %id, "Image deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/images/{id}/api-data/ -- metadata for other services.
pub async fn image_api_data(
    State(state): State<ImageState>,
    Path(id): Path<String>,
) -> AppResult<Json<ImageMetadata>> {
    let record = load_record(&state, parse_id(&id)?).await?;
    Ok(Json(to_metadata(record, &state.config.public_base_url)))
}
