//! Prometheus text-format metrics.
//!
//! [`track`] records request counts and latency per method and matched
//! route; [`Metrics::render`] produces the `/metrics` payload.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

#[derive(Debug, Default, Clone, Copy)]
struct RequestStats {
    count: u64,
    seconds: f64,
}

/// Request counters keyed by `(method, endpoint)`.
#[derive(Debug, Default)]
pub struct Metrics {
    requests: Mutex<BTreeMap<(String, String), RequestStats>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, method: &str, endpoint: &str, elapsed: Duration) {
        let Ok(mut requests) = self.requests.lock() else {
            return;
        };
        let stats = requests
            .entry((method.to_string(), endpoint.to_string()))
            .or_default();
        stats.count += 1;
        stats.seconds += elapsed.as_secs_f64();
    }

    /// Render the HTTP request metrics.
    pub fn render(&self) -> String {
        let snapshot: Vec<((String, String), RequestStats)> = match self.requests.lock() {
            Ok(requests) => requests.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            Err(_) => Vec::new(),
        };

        let mut out = String::new();
        out.push_str("# HELP http_requests_total Total HTTP requests.\n");
        out.push_str("# TYPE http_requests_total counter\n");
        for ((method, endpoint), stats) in &snapshot {
            let _ = writeln!(
                out,
                "http_requests_total{{method=\"{method}\",endpoint=\"{endpoint}\"}} {}",
                stats.count
            );
        }

        out.push_str("# HELP http_request_duration_seconds HTTP request latency.\n");
        out.push_str("# TYPE http_request_duration_seconds summary\n");
        for ((method, endpoint), stats) in &snapshot {
            let labels = format!("method=\"{method}\",endpoint=\"{endpoint}\"");
            let _ = writeln!(out, "http_request_duration_seconds_sum{{{labels}}} {}", stats.seconds);
            let _ = writeln!(out, "http_request_duration_seconds_count{{{labels}}} {}", stats.count);
        }
        out
    }
}

/// Render a gauge family with one label.
pub fn render_gauge(name: &str, help: &str, label: &str, samples: &[(&str, i64)]) -> String {
    let mut out = format!("# HELP {name} {help}\n# TYPE {name} gauge\n");
    for (value, sample) in samples {
        let _ = writeln!(out, "{name}{{{label}=\"{value}\"}} {sample}");
    }
    out
}

/// Middleware recording one sample per routed request.
pub async fn track(State(metrics): State<Arc<Metrics>>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    metrics.record(&method, &endpoint, start.elapsed());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_counts_and_latency() {
        let metrics = Metrics::new();
        metrics.record("GET", "/health", Duration::from_millis(10));
        metrics.record("GET", "/health", Duration::from_millis(30));

        let text = metrics.render();
        assert!(text.contains("http_requests_total{method=\"GET\",endpoint=\"/health\"} 2"));
        assert!(text.contains("http_request_duration_seconds_count{method=\"GET\",endpoint=\"/health\"} 2"));
        assert!(text.contains("# TYPE http_requests_total counter"));
    }

    #[test]
    fn gauge_lines() {
        let text = render_gauge("ocr_jobs", "Jobs by state.", "state", &[("pending", 3)]);
        assert!(text.contains("# TYPE ocr_jobs gauge"));
        assert!(text.contains("ocr_jobs{state=\"pending\"} 3"));
    }
}
