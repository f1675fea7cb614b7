//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, route builds)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-route and aggregate metrics
//!
//! # Metrics
//! - `proxy_requests_total` (counter): total requests by method, status, route
//! - `proxy_request_duration_seconds` (histogram): latency by route
//! - `proxy_route_build_failures_total` (counter): routes excluded from a snapshot
//! - `proxy_routes_published` (gauge): routes in the live snapshot
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels for route, method, status code

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("proxy_requests_total", "Total proxied requests");
    describe_histogram!(
        "proxy_request_duration_seconds",
        metrics::Unit::Seconds,
        "Time from request receipt to upstream response"
    );
    describe_counter!(
        "proxy_route_build_failures_total",
        "Routes left out of a published snapshot"
    );
    describe_gauge!("proxy_routes_published", "Routes in the live snapshot");

    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_route_build_failure(route: &str) {
    counter!("proxy_route_build_failures_total", "route" => route.to_string()).increment(1);
}

pub fn record_routes_published(count: usize) {
    gauge!("proxy_routes_published").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("GET", 200, "api", Instant::now());
        record_route_build_failure("api");
        record_routes_published(3);
    }
}
