//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define pool metrics (size, health, selections, probe failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `relay_pool_endpoints` (gauge): registered endpoints
//! - `relay_pool_endpoint_healthy` (gauge): 1=alive, 0=unhealthy, per endpoint
//! - `relay_pool_probe_failures_total` (counter): failed probes, per endpoint
//! - `relay_pool_selections_total` (counter): selections, per endpoint
//! - `relay_pool_unavailable_total` (counter): selections with no healthy endpoint
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed, so library users
//!   and tests pay nothing
//! - The exporter cannot drop a labelled series, so removing an endpoint
//!   zeroes its health gauge; its counters keep their final value until restart

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

const ENDPOINTS: &str = "relay_pool_endpoints";
const ENDPOINT_HEALTHY: &str = "relay_pool_endpoint_healthy";
const PROBE_FAILURES: &str = "relay_pool_probe_failures_total";
const SELECTIONS: &str = "relay_pool_selections_total";
const UNAVAILABLE: &str = "relay_pool_unavailable_total";

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        return;
    }

    describe_gauge!(ENDPOINTS, "Number of registered relay endpoints");
    describe_gauge!(ENDPOINT_HEALTHY, "Endpoint liveness after the last probe (1=alive)");
    describe_counter!(PROBE_FAILURES, "Failed liveness probes");
    describe_counter!(SELECTIONS, "Times an endpoint was selected");
    describe_counter!(UNAVAILABLE, "Selections that found no healthy endpoint");

    tracing::info!(address = %addr, "Metrics exporter listening");
}

pub fn record_pool_size(endpoints: usize) {
    gauge!(ENDPOINTS).set(endpoints as f64);
}

pub fn record_endpoint_health(endpoint: &str, alive: bool) {
    gauge!(ENDPOINT_HEALTHY, "endpoint" => endpoint.to_string()).set(if alive { 1.0 } else { 0.0 });
}

pub fn record_endpoint_removed(endpoint: &str) {
    record_endpoint_health(endpoint, false);
}

pub fn record_probe_failure(endpoint: &str) {
    counter!(PROBE_FAILURES, "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_selection(endpoint: &str) {
    counter!(SELECTIONS, "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_unavailable() {
    counter!(UNAVAILABLE).increment(1);
}
