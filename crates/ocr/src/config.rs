use std::path::PathBuf;
use std::time::Duration;

/// Default location of the `tesseract` binary.
const DEFAULT_TESSERACT_CMD: &str = "/usr/bin/tesseract";

/// Default language packs (`-l` argument).
const DEFAULT_LANGUAGES: &str = "rus+eng";

/// Default wall-clock limit for one recognition run.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Tesseract invocation settings.
#[derive(Debug, Clone)]
pub struct TesseractConfig {
    pub command: PathBuf,
    pub languages: String,
    pub timeout: Duration,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from(DEFAULT_TESSERACT_CMD),
            languages: DEFAULT_LANGUAGES.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl TesseractConfig {
    /// Load from environment variables with sensible defaults.
    ///
    /// | Env Var            | Default              |
    /// |--------------------|----------------------|
    /// | `TESSERACT_CMD`    | `/usr/bin/tesseract` |
    /// | `OCR_LANGUAGES`    | `rus+eng`            |
    /// | `OCR_TIMEOUT_SECS` | `120`                |
    pub fn from_env() -> Self {
        let command = std::env::var("TESSERACT_CMD")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TESSERACT_CMD));

        let languages = std::env::var("OCR_LANGUAGES")
            .ok()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGES.to_string());

        let timeout_secs: u64 = std::env::var("OCR_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            command,
            languages,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}
