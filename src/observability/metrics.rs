//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method and final status
//! - `proxy_request_duration_seconds` (histogram): time until origin headers
//! - `proxy_upstream_errors_total` (counter): failures by error class
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus
//! recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::config::ObservabilityConfig;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Start the scrape endpoint if enabled. Returns whether it is running;
/// failures are logged, never fatal.
pub fn init_from_config(config: &ObservabilityConfig) -> bool {
    if !config.metrics_enabled {
        return false;
    }

    if let Ok(addr) = config.metrics_address.parse() {
        match init_metrics(addr) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to start metrics endpoint");
                false
            }
        }
    } else {
        tracing::error!(
            metrics_address = %config.metrics_address,
            "Failed to parse metrics address"
        );
        false
    }
}

/// Record a finished request, whether relayed or rejected.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a failure class (`invalid_target`, `build`, `upstream`).
pub fn record_error(kind: &'static str) {
    counter!("proxy_upstream_errors_total", "kind" => kind).increment(1);
}
