//! Upload validation and derived image attributes.
//!
//! Attributes are computed once from the uploaded bytes: byte size, pixel
//! dimensions (header-only decode) and the format, which is the lower-cased
//! file extension checked against [`ALLOWED_FORMATS`].

use std::io::Cursor;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// File extensions accepted on upload.
pub const ALLOWED_FORMATS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Maximum length of an image title, in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// Directory prefix for stored binaries inside the storage root.
pub const STORAGE_PREFIX: &str = "images";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Extract the lower-cased extension from a client-supplied filename.
///
/// Returns `None` when the name has no dot or ends with one.
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Validate the filename's extension against [`ALLOWED_FORMATS`] and return
/// the normalised format.
pub fn validate_format(filename: &str) -> Result<String, CoreError> {
    let ext = extension_of(filename).ok_or_else(|| {
        CoreError::UnsupportedFormat(format!(
            "File '{filename}' has no extension. Allowed: {}",
            ALLOWED_FORMATS.join(", ")
        ))
    })?;

    if ALLOWED_FORMATS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(CoreError::UnsupportedFormat(format!(
            "File extension '.{ext}' is not allowed. Allowed: {}",
            ALLOWED_FORMATS.join(", ")
        )))
    }
}

/// Validate and trim an image title.
pub fn validate_title(title: &str) -> Result<String, CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Derived attributes
// ---------------------------------------------------------------------------

/// Facts computed from the binary at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAttributes {
    pub size_bytes: i64,
    pub width: i32,
    pub height: i32,
    pub format: String,
}

/// Read pixel dimensions from the image header without decoding pixels.
pub fn read_dimensions(data: &[u8]) -> Result<(u32, u32), ::image::ImageError> {
    ::image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .into_dimensions()
}

/// Compute size, dimensions and format for an upload.
///
/// `format` must already be validated. Empty payloads are rejected. When the
/// header cannot be read the dimensions are recorded as `0x0`; the record is
/// still accepted, since the format check is extension based.
pub fn derive_attributes(data: &[u8], format: &str) -> Result<DerivedAttributes, CoreError> {
    if data.is_empty() {
        return Err(CoreError::Validation("Uploaded file is empty".into()));
    }

    let (width, height) = match read_dimensions(data) {
        Ok((w, h)) => (
            i32::try_from(w).unwrap_or(i32::MAX),
            i32::try_from(h).unwrap_or(i32::MAX),
        ),
        Err(_) => (0, 0),
    };

    Ok(DerivedAttributes {
        size_bytes: data.len() as i64,
        width,
        height,
        format: format.to_string(),
    })
}

/// Build a fresh storage reference: `images/{year}/{month}/{uuid-hex}.{ext}`.
pub fn storage_ref_for(format: &str, now: Timestamp) -> String {
    use chrono::Datelike;

    format!(
        "{STORAGE_PREFIX}/{}/{:02}/{}.{format}",
        now.year(),
        now.month(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Byte size expressed in MiB, rounded to 2 decimals.
pub fn file_size_mb(size_bytes: i64) -> f64 {
    if size_bytes <= 0 {
        return 0.0;
    }
    (size_bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}
