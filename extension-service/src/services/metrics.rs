//! Metrics collection for extension-service.
//!
//! HTTP metrics come from the shared middleware; extension counters are recorded here.
//! Everything is exported through a single Prometheus recorder.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Subsequent calls are no-ops.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!("Failed to install Prometheus recorder: {}", e),
    }
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record which extension served a request.
pub fn record_extension_request(extension: &str) {
    counter!("extension_requests_total", "extension" => extension.to_string()).increment(1);
}

/// Record a chat completion attempt (`ok` or the provider error kind).
pub fn record_chat_completion(outcome: &str) {
    counter!("chat_completions_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record an encyclopedia fetch (`ok` or the fetch error kind).
pub fn record_wiki_fetch(outcome: &str) {
    counter!("wiki_fetches_total", "outcome" => outcome.to_string()).increment(1);
}
