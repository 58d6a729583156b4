//! # Bridge Telemetry
//!
//! Logging and metrics for the pub/sub bridge.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bridge_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config).expect("Failed to init telemetry");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BRIDGE_SERVICE_NAME` | `pubsub-bridge` | Service name in logs |
//! | `BRIDGE_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `BRIDGE_CONSOLE_OUTPUT` | `true` | Emit logs to stdout |
//! | `BRIDGE_JSON_LOGS` | `false` | JSON log lines (default on in containers) |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, MESSAGES_DELIVERED, MESSAGES_DROPPED, MESSAGES_PUBLISHED,
    TRANSPORT_ERRORS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logger: {0}")]
    LoggerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the logging subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
