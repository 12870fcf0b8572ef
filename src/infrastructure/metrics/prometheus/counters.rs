use metrics::{counter, histogram};
use std::time::Instant;

/// Count a dispatched request and track its latency.
pub fn track_http_request(start: Instant, resource: &str, method: &str, status: u16) {
    counter!(
        "http_requests_total",
        "resource" => resource.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!("http_request_duration_seconds", "resource" => resource.to_string())
        .record(start.elapsed());
}

/// Count an upstream call by outcome and track its latency.
pub fn track_upstream_call(start: Instant, status: Option<u16>) {
    let outcome = status.map_or_else(|| "transport_error".to_string(), |s| s.to_string());

    counter!("upstream_requests_total", "status" => outcome).increment(1);
    histogram!("upstream_request_duration_seconds").record(start.elapsed());
}
