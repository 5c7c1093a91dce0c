//! Metrics collection and exposition.
//!
//! # Metrics
//! - `credsnare_records_total` (counter): deliveries by sink kind and outcome
//! - `credsnare_spawn_failures_total` (counter): listeners that failed to start
//! - `credsnare_probes_total` (counter): inbound probes seen by built-in engines
//! - `credsnare_active_listeners` (gauge): listeners currently registered

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_delivery(sink: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!("credsnare_records_total", "sink" => sink, "outcome" => outcome).increment(1);
}

pub fn record_spawn_failure(protocol: &'static str) {
    metrics::counter!("credsnare_spawn_failures_total", "protocol" => protocol).increment(1);
}

pub fn record_probe(protocol: &'static str) {
    metrics::counter!("credsnare_probes_total", "protocol" => protocol).increment(1);
}

pub fn set_active_listeners(count: usize) {
    metrics::gauge!("credsnare_active_listeners").set(count as f64);
}
