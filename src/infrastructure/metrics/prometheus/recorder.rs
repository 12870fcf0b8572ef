use anyhow::{anyhow, Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Mutex, OnceLock};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Install the Prometheus recorder globally, once per process.
///
/// Later calls reuse the installed recorder.
pub fn init_metrics() -> Result<()> {
    // ---
    let _guard = INIT_LOCK
        .lock()
        .map_err(|_| anyhow!("metrics initialisation lock poisoned"))?;

    if HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    HANDLE
        .set(handle)
        .map_err(|_| anyhow!("metrics recorder already initialized"))
}

/// Render the current metrics in Prometheus text format.
pub fn render_metrics() -> String {
    // ---
    HANDLE.get().map(PrometheusHandle::render).unwrap_or_default()
}
