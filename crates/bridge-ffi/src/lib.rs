//! # Bridge FFI - C ABI for Publisher/Subscriber Endpoints
//!
//! Every endpoint operation as an `extern "C"` function returning a
//! [`ResultCode`].
//!
//! ## Conventions
//!
//! - Endpoints are addressed by non-zero `u64` tokens; `0` is the null
//!   handle. Destroy clears the caller's token, and a destroyed token
//!   resolves to `NullArgument` forever after.
//! - Strings are NUL-terminated and copied on entry.
//! - Out-parameters are left untouched on failure.
//! - Messages cross the boundary as [`BridgeMessage`] views.
//! - Callbacks run on the transport's delivery thread and must not call back
//!   into the handle that is invoking them.
//! - No panic unwinds into the caller; it is reported as `Error`.
//!
//! All endpoints share one in-process [`MemoryTransport`], configured from
//! the environment on first use.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod boundary;
pub mod message;
pub mod publisher;
mod registry;
pub mod subscriber;

pub use message::{
    BridgeMessage, LifecycleCallback, MessageCallback, TopicMessageCallback,
    BRIDGE_CONTENT_TYPE_BYTEDATA, BRIDGE_CONTENT_TYPE_EVENT,
};
pub use registry::NULL_HANDLE;

use bridge_bus::{MemoryTransport, MemoryTransportConfig};
use bridge_telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
use bridge_types::ResultCode;
use lazy_static::lazy_static;
use std::panic;
use tracing::warn;

lazy_static! {
    static ref TRANSPORT: MemoryTransport =
        MemoryTransport::with_config(MemoryTransportConfig::from_env());
}

pub(crate) fn transport() -> &'static MemoryTransport {
    &TRANSPORT
}

/// Register metrics and install logging from the `BRIDGE_*` environment.
///
/// Calling it again is a no-op. An unparsable log filter is
/// `InvalidArgument`; a subscriber already installed by the host is `Error`.
#[no_mangle]
pub extern "C" fn bridge_init_logging() -> ResultCode {
    let outcome = panic::catch_unwind(|| init_telemetry(&TelemetryConfig::from_env()));
    match outcome {
        Ok(Ok(())) => ResultCode::Ok,
        Ok(Err(TelemetryError::Config(reason))) => {
            warn!(reason = %reason, "Invalid logging configuration");
            ResultCode::InvalidArgument
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Telemetry initialization failed");
            ResultCode::Error
        }
        Err(_) => ResultCode::Error,
    }
}
