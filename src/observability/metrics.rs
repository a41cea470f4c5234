//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define listener metrics (requests, latency, connections, captures)
//! - Expose a Prometheus-compatible scrape endpoint when enabled
//!
//! # Metrics
//! - `listener_requests_total` (counter): requests by method, route, status
//! - `listener_request_duration_seconds` (histogram): latency distribution
//! - `listener_active_connections` (gauge): current connection count
//! - `listener_captures_total` (counter): persisted captures by kind
//! - `listener_attachments_total` (counter): attachments written
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality: route names, not paths, and a fixed method set

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::http::UNKNOWN_METHOD;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Closed set of `method` label values. Anything a client invents is `other`.
pub fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "POST" => "POST",
        UNKNOWN_METHOD => UNKNOWN_METHOD,
        _ => "other",
    }
}

/// Record one completed request.
pub fn record_request(method: &str, route: &'static str, status: u16, started: Instant) {
    ::metrics::counter!(
        "listener_requests_total",
        "method" => method_label(method),
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("listener_request_duration_seconds", "route" => route)
        .record(started.elapsed().as_secs_f64());
}

pub fn set_active_connections(count: u64) {
    ::metrics::gauge!("listener_active_connections").set(count as f64);
}

/// `kind` is `plain` or `multipart`.
pub fn record_capture(kind: &'static str) {
    ::metrics::counter!("listener_captures_total", "kind" => kind).increment(1);
}

pub fn record_attachments(count: usize) {
    ::metrics::counter!("listener_attachments_total").increment(count as u64);
}
