//! Text recognition port plus the engine-independent parts of it:
//! parsing Tesseract's TSV word table and aggregating per-token confidence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Minimum number of tab-separated columns in a TSV data row
/// (`level` .. `conf`); `text` may be absent on non-word rows.
const TSV_MIN_COLUMNS: usize = 11;

/// Index of the `conf` column.
const TSV_CONF_COLUMN: usize = 10;

/// Index of the `text` column.
const TSV_TEXT_COLUMN: usize = 11;

/// Recognised text with its aggregated confidence (0..=100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrOutput {
    pub text: String,
    pub confidence: f64,
}

/// One recognised token with the engine's confidence for it.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrToken {
    pub text: String,
    pub confidence: f64,
}

impl OcrToken {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Error type for OCR engines. Never retried by the engine itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OcrError {
    /// Decode, recognition or engine execution failure.
    #[error("OCR processing failed: {0}")]
    Processing(String),
}

/// Text recognition over raw image bytes.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognise text and report the averaged token confidence.
    async fn extract(&self, image: &[u8]) -> Result<OcrOutput, OcrError>;

    /// Recognise text only, with whitespace runs collapsed.
    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError> {
        Ok(normalize_whitespace(&self.extract(image).await?.text))
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Join tokens that are not blank with single spaces and average the positive
/// confidences of those tokens, rounded to 2 decimals (0 when none).
///
/// Token text is joined as recognised; blank tokens are only skipped.
pub fn aggregate_tokens(tokens: &[OcrToken]) -> OcrOutput {
    let mut parts = Vec::new();
    let mut sum = 0.0;
    let mut counted = 0usize;

    for token in tokens {
        if token.text.trim().is_empty() {
            continue;
        }
        parts.push(token.text.as_str());
        if token.confidence > 0.0 {
            sum += token.confidence;
            counted += 1;
        }
    }

    let confidence = if counted == 0 {
        0.0
    } else {
        round2(sum / counted as f64)
    };

    OcrOutput {
        text: parts.join(" "),
        confidence,
    }
}

/// Collapse every whitespace run into a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// TSV parsing
// ---------------------------------------------------------------------------

/// Parse the `tsv` output of `tesseract` into tokens.
///
/// The header row is skipped. Structural rows (page, block, line) carry
/// `conf = -1` and no text and are returned as such; [`aggregate_tokens`]
/// ignores them.
pub fn parse_tsv(tsv: &str) -> Result<Vec<OcrToken>, OcrError> {
    let mut tokens = Vec::new();

    for (line_no, line) in tsv.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with("level") {
            continue;
        }

        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < TSV_MIN_COLUMNS {
            return Err(OcrError::Processing(format!(
                "malformed TSV row {}: expected at least {TSV_MIN_COLUMNS} columns, got {}",
                line_no + 1,
                columns.len()
            )));
        }

        let confidence: f64 = columns[TSV_CONF_COLUMN].trim().parse().map_err(|_| {
            OcrError::Processing(format!(
                "malformed TSV row {}: invalid confidence '{}'",
                line_no + 1,
                columns[TSV_CONF_COLUMN]
            ))
        })?;
        let text = columns.get(TSV_TEXT_COLUMN).copied().unwrap_or("");

        tokens.push(OcrToken::new(text, confidence));
    }

    Ok(tokens)
}
