use std::sync::Arc;
use std::time::Instant;

/// Abstraction for application metrics (counters, histograms).
pub trait Metrics: Send + Sync + 'static {
    // ---
    /// Render current metrics in Prometheus text format.
    fn render(&self) -> String;

    /// Record one dispatched request, labelled by resource family.
    fn record_http_request(&self, start: Instant, resource: &str, method: &str, status: u16);

    /// Record one upstream media API call. `status` is `None` on transport failure.
    fn record_upstream_call(&self, start: Instant, status: Option<u16>);
}

/// Type alias for any backend that implements Metrics.
pub type MetricsPtr = Arc<dyn Metrics>;
