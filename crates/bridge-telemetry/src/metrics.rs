//! Prometheus metrics for bridge endpoints.
//!
//! All metrics follow the naming convention: `bridge_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Messages handed to the transport by publishers
    pub static ref MESSAGES_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("bridge_messages_published_total", "Messages handed to the transport"),
        &["content_type", "scope"]  // scope: untopiced/topic
    ).expect("metric creation failed");

    /// Messages delivered to subscriber callbacks
    pub static ref MESSAGES_DELIVERED: CounterVec = CounterVec::new(
        Opts::new("bridge_messages_delivered_total", "Messages delivered to subscriber callbacks"),
        &["content_type", "scope"]
    ).expect("metric creation failed");

    /// Messages dropped before reaching a callback
    pub static ref MESSAGES_DROPPED: CounterVec = CounterVec::new(
        Opts::new("bridge_messages_dropped_total", "Messages dropped before reaching a callback"),
        &["reason"]  // reason: unknown_content_type/malformed_payload/lagged/no_listener
    ).expect("metric creation failed");

    /// Transport failures surfaced to callers
    pub static ref TRANSPORT_ERRORS: CounterVec = CounterVec::new(
        Opts::new("bridge_transport_errors_total", "Transport failures by operation"),
        &["operation"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(MESSAGES_PUBLISHED.clone()),
        Box::new(MESSAGES_DELIVERED.clone()),
        Box::new(MESSAGES_DROPPED.clone()),
        Box::new(TRANSPORT_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
