//! Metrics collection and exposition.
//!
//! # Metrics
//! - `retry_attempts_total` (counter): upstream invocations, by instance
//! - `retry_replays_total` (counter): responses sent to clients, by instance
//!   and outcome (`success` or `exhausted`)

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one upstream invocation.
pub fn record_attempt(instance: &str) {
    ::metrics::counter!("retry_attempts_total", "instance" => instance.to_string()).increment(1);
}

/// Record the response chosen for a client.
pub fn record_replay(instance: &str, outcome: &'static str) {
    ::metrics::counter!(
        "retry_replays_total",
        "instance" => instance.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
