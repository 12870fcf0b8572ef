//! Prometheus metrics implementation.
//!
//! Delegates to the sibling `counters.rs` and `recorder.rs` utilities, which
//! record through the global `metrics` crate registry and render it in
//! Prometheus text format.

use crate::domain::Metrics;
use std::time::Instant;

/// Prometheus-based metrics implementation.
///
/// Empty because all state lives in the global `metrics` registry.
pub struct PrometheusMetrics {}

impl PrometheusMetrics {
    pub fn new() -> Self {
        tracing::info!("Creating Prometheus metrics");
        PrometheusMetrics {}
    }
}

impl Metrics for PrometheusMetrics {
    fn render(&self) -> String {
        super::render_metrics()
    }

    fn record_http_request(&self, start: Instant, resource: &str, method: &str, status: u16) {
        super::track_http_request(start, resource, method, status);
    }

    fn record_upstream_call(&self, start: Instant, status: Option<u16>) {
        super::track_upstream_call(start, status);
    }
}
