//! Prometheus metrics recording.

use metrics::{counter, histogram};
use std::time::Duration;

/// Records HTTP request metrics.
pub fn record_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Records the outcome of a search request: `ranked`, `fallback` or `backend_error`.
pub fn record_search(outcome: &'static str) {
    counter!("bookfinder_search_total", "outcome" => outcome).increment(1);
}

/// Records the latency of one search branch and counts its failures.
pub fn record_branch(branch: &'static str, duration: Duration, ok: bool) {
    histogram!("bookfinder_branch_duration_seconds", "branch" => branch)
        .record(duration.as_secs_f64());
    if !ok {
        counter!("bookfinder_branch_failures_total", "branch" => branch).increment(1);
    }
}
