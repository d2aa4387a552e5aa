//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hub_active_connections` (gauge): admitted connections
//! - `hub_connections_total` (counter): accepted sockets by `outcome`
//!   (accepted, rejected, duplicate)
//! - `hub_disconnects_total` (counter): teardowns by `cause`
//! - `hub_messages_received_total` (counter): decoded messages
//! - `hub_message_bytes` (histogram): decoded payload sizes
//! - `hub_faults_total` (counter): per-connection faults by `kind`
//!
//! All recorders are no-ops until `init_metrics` installs an exporter.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection(outcome: &'static str) {
    metrics::counter!("hub_connections_total", "outcome" => outcome).increment(1);
}

pub fn record_active_connections(count: usize) {
    metrics::gauge!("hub_active_connections").set(count as f64);
}

pub fn record_disconnect(cause: &'static str) {
    metrics::counter!("hub_disconnects_total", "cause" => cause).increment(1);
}

pub fn record_message(bytes: usize) {
    metrics::counter!("hub_messages_received_total").increment(1);
    metrics::histogram!("hub_message_bytes").record(bytes as f64);
}

pub fn record_fault(kind: &'static str) {
    metrics::counter!("hub_faults_total", "kind" => kind).increment(1);
}
