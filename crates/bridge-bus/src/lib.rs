//! # Bridge Bus - Typed Publisher/Subscriber Endpoints
//!
//! Publishers bind a port and send typed messages, optionally scoped by
//! topic. Subscribers connect to a publisher, filter by topic prefix and
//! receive reconstructed messages through a listener.
//!
//! ```text
//! ┌──────────────┐                               ┌──────────────┐
//! │  Publisher   │  publish*()                   │  Subscriber  │
//! │              │ ──────┐                       │              │
//! └──────────────┘       │                       └──────────────┘
//!                        ▼                              ↑
//!                  ┌──────────────┐   Delivery   ┌──────────────┐
//!                  │  Transport   │ ───────────▶ │  Callback    │
//!                  │  (ports.rs)  │              │  bridge      │
//!                  └──────────────┘              └──────────────┘
//! ```
//!
//! The transport is a trait seam; [`memory::MemoryTransport`] is the
//! in-process implementation.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bridge;
pub mod memory;
pub mod ports;
pub mod publisher;
pub mod subscriber;

#[cfg(test)]
mod testing;

// Re-export main types
pub use bridge::{
    dispatch_delivery, forward_lifecycle, DispatchOutcome, DropReason, LifecycleListener,
    MessageListener, NoopListener,
};
pub use memory::{MemoryTransport, MemoryTransportConfig};
pub use ports::{Delivery, Notification, Transport, TransportHandle, TransportSink};
pub use publisher::Publisher;
pub use subscriber::Subscriber;

/// Frames buffered per port before slow subscribers start losing them.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Lifecycle position of an endpoint.
///
/// Keys can only be configured in `Created`. Stopping does not return an
/// endpoint to `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Created,
    Started,
    Stopped,
}
