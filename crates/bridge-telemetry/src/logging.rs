//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! human-readable or a JSON layer. Every log line carries the fields the
//! endpoints emit (`port`, `topic`, `content_type`, ...).

use crate::{TelemetryConfig, TelemetryError};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the global subscriber.
///
/// Only the first successful call has an effect; later calls return `Ok`.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let result = install(config);
    if result.is_err() {
        INITIALIZED.store(false, Ordering::SeqCst);
    }
    result
}

fn install(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(e.to_string()))?;

    if !config.console_output {
        return tracing_subscriber::registry()
            .with(env_filter)
            .try_init()
            .map_err(|e| TelemetryError::LoggerInit(e.to_string()));
    }

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggerInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggerInit(e.to_string()))?;
    }

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}

/// Log an endpoint event with its kind attached.
#[macro_export]
macro_rules! log_endpoint {
    ($level:ident, $endpoint:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            endpoint = $endpoint,
            $($($field)*,)?
            $msg
        )
    };
}
