//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests seen by the request logger, by method
//! - `gateway_session_events_total` (counter): saved / refreshed / destroyed sessions
//! - `gateway_session_store_failures_total` (counter): backend errors surfaced as 5xx
//! - `gateway_preflights_total` (counter): OPTIONS requests answered by the origin policy

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str) {
    metrics::counter!("gateway_requests_total", "method" => method.to_string()).increment(1);
}

pub fn record_session_event(event: &'static str) {
    metrics::counter!("gateway_session_events_total", "event" => event).increment(1);
}

pub fn record_store_failure(stage: &'static str) {
    metrics::counter!("gateway_session_store_failures_total", "stage" => stage).increment(1);
}

pub fn record_preflight() {
    metrics::counter!("gateway_preflights_total").increment(1);
}
