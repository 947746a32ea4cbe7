//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by service, status
//! - `gateway_request_duration_seconds` (histogram): dispatch latency
//! - `gateway_breaker_transitions_total` (counter): breaker events by service
//! - `gateway_service_health` (gauge): 1=healthy, 0=unhealthy per service
//!
//! # Design Decisions
//! - Prometheus exposition on its own listener, separate from proxy traffic
//! - Recording helpers are no-ops until an exporter is installed, so library
//!   users and tests need no metrics setup

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`. Call once at startup.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(err) => tracing::error!(error = %err, "failed to install metrics exporter"),
    }
}

/// Record one proxied request's final status and latency.
pub fn record_proxy_request(service: &str, status: u16, start: Instant) {
    let labels = [
        ("service", service.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("gateway_requests_total", &labels).increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "service" => service.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one breaker event (open/close/halfOpen/fallback).
pub fn record_breaker_transition(service: &str, event: &str) {
    metrics::counter!(
        "gateway_breaker_transitions_total",
        "service" => service.to_string(),
        "event" => event.to_string()
    )
    .increment(1);
}

/// Record the advisory health of a service.
pub fn record_service_health(service: &str, healthy: bool) {
    metrics::gauge!(
        "gateway_service_health",
        "service" => service.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}
