//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_errors_total` (counter): handled failures by classification
//!
//! # Design Decisions
//! - Prometheus exporter runs its own HTTP listener
//! - Recording without an installed exporter is a no-op

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a failure handled by the error envelope mapper.
pub fn record_error(kind: &'static str) {
    metrics::counter!("gateway_errors_total", "kind" => kind).increment(1);
}
