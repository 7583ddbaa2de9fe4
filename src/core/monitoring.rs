//! Monitoring for the edge interdiction service.
//!
//! Counters and histograms describing interdiction decisions, exported in
//! Prometheus text format. Without an installed recorder every call is a no-op.

use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::core::event_store::EventCategory;

pub const REQUESTS_TOTAL: &str = "edge_requests_total";
pub const DECOY_DELAY_SECONDS: &str = "edge_decoy_delay_seconds";
pub const EVENT_STORE_SIZE: &str = "edge_event_store_size";
pub const RATE_LIMIT_SOURCES: &str = "edge_rate_limit_tracked_sources";

/// Install the global Prometheus recorder
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    metrics::describe_counter!(REQUESTS_TOTAL, "Requests seen by the edge layer, by category");
    metrics::describe_histogram!(DECOY_DELAY_SECONDS, "Artificial delay applied to decoy responses");
    metrics::describe_gauge!(EVENT_STORE_SIZE, "Security events currently retained");
    metrics::describe_gauge!(RATE_LIMIT_SOURCES, "Source addresses with a live rate-limit bucket");
    Ok(handle)
}

/// Count one request outcome
pub fn record_outcome(category: EventCategory) {
    metrics::increment_counter!(REQUESTS_TOTAL, "category" => category.as_str());
}

/// Observe one decoy delay
pub fn record_decoy_delay(category: EventCategory, delay: Duration) {
    metrics::histogram!(DECOY_DELAY_SECONDS, delay.as_secs_f64(), "category" => category.as_str());
}

/// Publish the number of tracked rate-limit buckets
pub fn record_tracked_sources(count: usize) {
    metrics::gauge!(RATE_LIMIT_SOURCES, count as f64);
}
