//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (requests by outcome, connections, bytes sent)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `router_requests_total` (counter): received chunks by outcome
//! - `router_connections_total` (counter): accepted clients
//! - `router_active_connections` (gauge): current connection count
//! - `router_bytes_sent_total` (counter): bytes written to clients
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so the core and
//!   tests never depend on the exporter

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// How a received chunk was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Matched,
    NotFound,
    Malformed,
    Incomplete,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Matched => "matched",
            RequestOutcome::NotFound => "not_found",
            RequestOutcome::Malformed => "malformed",
            RequestOutcome::Incomplete => "incomplete",
        }
    }
}

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: RequestOutcome) {
    metrics::counter!("router_requests_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn connection_opened() {
    metrics::counter!("router_connections_total").increment(1);
    metrics::gauge!("router_active_connections").increment(1.0);
}

pub fn connection_closed() {
    metrics::gauge!("router_active_connections").decrement(1.0);
}

pub fn record_bytes_sent(len: usize) {
    metrics::counter!("router_bytes_sent_total").increment(len as u64);
}
