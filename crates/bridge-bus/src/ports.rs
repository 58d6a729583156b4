//! # Transport Port
//!
//! The interface the endpoints require from a transport. Socket framing,
//! encryption handshakes and I/O threads all live behind it.
//!
//! ```text
//!  Publisher / Subscriber ──open/start/send/subscribe──▶ TransportHandle
//!           ▲                                                 │
//!           └──────── TransportSink (notify / deliver) ◀──────┘
//! ```
//!
//! Sink methods are called on the transport's own threads.

use bridge_types::{Address, ContentType, KeyMaterial, Role, TransportError};
use std::sync::Arc;

/// Lifecycle notifications raised by a transport handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Started,
    Stopped,
    Errored(TransportError),
}

/// One inbound message as the transport hands it over.
///
/// Borrowed data is only valid for the duration of the sink call.
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    /// Topic the message was published on, if any.
    pub topic: Option<&'a str>,
    /// Content-type tag resolved from the frame header.
    pub tag: u32,
    /// Encoded payload.
    pub payload: &'a [u8],
}

/// Receives notifications and messages from a transport handle.
pub trait TransportSink: Send + Sync {
    /// A lifecycle transition happened.
    fn notify(&self, notification: Notification);

    /// A message arrived.
    fn deliver(&self, delivery: Delivery<'_>);
}

/// Factory for transport handles.
pub trait Transport: Send + Sync {
    /// Open a handle for `role` at `address`. The handle is neither bound nor
    /// connected yet.
    fn open(
        &self,
        role: Role,
        address: &Address,
        sink: Arc<dyn TransportSink>,
    ) -> Result<Box<dyn TransportHandle>, TransportError>;
}

/// A single open transport handle, owned by exactly one endpoint.
pub trait TransportHandle: Send {
    /// Bind (publisher) or connect (subscriber) the address given at open.
    fn start(&mut self) -> Result<(), TransportError>;

    /// Connect to an additional remote address (subscriber only).
    fn connect(&mut self, address: &Address) -> Result<(), TransportError>;

    /// Unbind or disconnect everything.
    fn stop(&mut self) -> Result<(), TransportError>;

    /// Install key material. Called before `start`.
    fn set_keys(&mut self, keys: &KeyMaterial) -> Result<(), TransportError>;

    /// Put one encoded message on the wire.
    fn send(
        &mut self,
        topic: Option<&str>,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<(), TransportError>;

    /// Add a subscription. `None` subscribes to every message.
    fn subscribe(&mut self, topic: Option<&str>) -> Result<(), TransportError>;

    /// Remove a subscription. `None` removes the catch-all subscription.
    fn unsubscribe(&mut self, topic: Option<&str>) -> Result<(), TransportError>;

    /// Release every resource held by the handle. Idempotent.
    fn close(&mut self);
}
