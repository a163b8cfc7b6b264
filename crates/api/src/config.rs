use std::path::PathBuf;
use std::time::Duration;

/// Error raised for malformed configuration values.
#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub reason: String,
}

fn parse_env<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            key,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `default_port`             |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env(default_port: u16) -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port: parse_env("PORT", default_port)?,
            cors_origins,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30)?,
        })
    }
}

/// Default upload limit: 10 MiB.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Image service settings.
#[derive(Debug, Clone)]
pub struct ImageServiceConfig {
    /// Directory holding stored binaries, served under `/media`.
    pub media_root: PathBuf,
    /// Externally reachable base URL, used to build `image_url`.
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub detail_cache_ttl: Duration,
}

impl ImageServiceConfig {
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `MEDIA_ROOT`            | `media`                 |
    /// | `PUBLIC_BASE_URL`       | `http://localhost:8000` |
    /// | `MAX_UPLOAD_BYTES`      | `10485760`              |
    /// | `DETAIL_CACHE_TTL_SECS` | `600`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        let media_root = std::env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("media"));

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".into())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            media_root,
            public_base_url,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            detail_cache_ttl: Duration::from_secs(parse_env("DETAIL_CACHE_TTL_SECS", 600)?),
        })
    }
}
