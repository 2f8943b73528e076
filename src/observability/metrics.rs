//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (connections, records)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_connections_accepted_total` (counter): clients accepted
//! - `gateway_connections_closed_total` (counter): clients closed, by reason
//! - `gateway_records_received_total` (counter): complete records forwarded
//! - `gateway_active_connections` (gauge): current connection count
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - Labels only where cardinality is fixed (close reason)

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::net::connection::CloseReason;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_accepted() {
    metrics::counter!("gateway_connections_accepted_total").increment(1);
}

pub fn record_connection_closed(reason: CloseReason) {
    metrics::counter!("gateway_connections_closed_total", "reason" => reason.as_str())
        .increment(1);
}

pub fn record_records_received(count: usize) {
    metrics::counter!("gateway_records_received_total").increment(count as u64);
}

pub fn record_active_connections(count: usize) {
    metrics::gauge!("gateway_active_connections").set(count as f64);
}
