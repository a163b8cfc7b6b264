use std::time::Duration;

use imgocr_core::retry::RetryPolicy;

/// Settings for the OCR pipeline, its workers and the maintenance sweeper.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base URL of the image service API, without trailing slash.
    pub image_api_url: String,
    pub image_api_timeout: Duration,
    /// Recipient used when a job asks for email without naming one.
    pub default_email: Option<String>,
    pub retry: RetryPolicy,
    pub worker_concurrency: usize,
    pub poll_interval: Duration,
    /// Claims older than this are returned to the queue.
    pub job_lease: Duration,
    /// Terminal jobs older than this are purged.
    pub result_retention: Duration,
    pub maintenance_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_api_url: "http://localhost:8000/api".to_string(),
            image_api_timeout: Duration::from_secs(30),
            default_email: None,
            retry: RetryPolicy::default(),
            worker_concurrency: 4,
            poll_interval: Duration::from_millis(1000),
            job_lease: Duration::from_secs(1800),
            result_retention: Duration::from_secs(3600),
            maintenance_interval: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    /// Load from environment variables, falling back to [`Default`] per field.
    ///
    /// | Env Var                   | Default                     |
    /// |---------------------------|-----------------------------|
    /// | `IMAGE_API_URL`           | `http://localhost:8000/api` |
    /// | `IMAGE_API_TIMEOUT_SECS`  | `30`                        |
    /// | `OCR_DEFAULT_EMAIL`       | unset                       |
    /// | `OCR_MAX_ATTEMPTS`        | `3`                         |
    /// | `OCR_RETRY_DELAY_SECS`    | `60`                        |
    /// | `WORKER_CONCURRENCY`      | `4`                         |
    /// | `WORKER_POLL_INTERVAL_MS` | `1000`                      |
    /// | `JOB_LEASE_SECS`          | `1800`                      |
    /// | `RESULT_RETENTION_SECS`   | `3600`                      |
    /// | `MAINTENANCE_INTERVAL_SECS` | `60`                      |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let image_api_url = std::env::var("IMAGE_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(defaults.image_api_url);

        let default_email = std::env::var("OCR_DEFAULT_EMAIL")
            .ok()
            .filter(|e| !e.trim().is_empty());

        let retry = RetryPolicy::new(
            env_parse("OCR_MAX_ATTEMPTS").unwrap_or(defaults.retry.max_attempts),
            env_secs("OCR_RETRY_DELAY_SECS").unwrap_or(defaults.retry.delay),
        );

        Self {
            image_api_url,
            image_api_timeout: env_secs("IMAGE_API_TIMEOUT_SECS")
                .unwrap_or(defaults.image_api_timeout),
            default_email,
            retry,
            worker_concurrency: env_parse::<usize>("WORKER_CONCURRENCY")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.worker_concurrency),
            poll_interval: env_parse("WORKER_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            job_lease: env_secs("JOB_LEASE_SECS").unwrap_or(defaults.job_lease),
            result_retention: env_secs("RESULT_RETENTION_SECS")
                .unwrap_or(defaults.result_retention),
            maintenance_interval: env_secs("MAINTENANCE_INTERVAL_SECS")
                .unwrap_or(defaults.maintenance_interval),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}
