//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_http_requests_total` (counter): API requests by route, method, status
//! - `gateway_http_request_duration_seconds` (histogram): API latency by route
//! - `gateway_rpc_calls_total` (counter): RPC calls by method and status code
//!
//! # Design Decisions
//! - Recording is always on; without an installed recorder the macros are no-ops
//! - The Prometheus exporter is opt-in and its failure is not fatal

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::warn!(address = %addr, error = %e, "Metrics exporter not installed"),
    }
}

/// Record one bridged HTTP request.
pub fn record_http_request(route: &'static str, method: &str, status: u16, started: Instant) {
    metrics::counter!(
        "gateway_http_requests_total",
        "route" => route,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_http_request_duration_seconds", "route" => route)
        .record(started.elapsed().as_secs_f64());
}

/// Record one completed RPC call.
pub fn record_rpc_call(method: &'static str, code: tonic::Code) {
    metrics::counter!(
        "gateway_rpc_calls_total",
        "method" => method,
        "code" => format!("{:?}", code)
    )
    .increment(1);
}
