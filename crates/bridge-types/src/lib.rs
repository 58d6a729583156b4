//! # Bridge Types Crate
//!
//! Types shared by the endpoint crate, the C ABI and every transport.
//!
//! ## Design Principles
//!
//! - **Closed taxonomy**: every fallible operation reports a [`ResultCode`].
//! - **Tagged messages**: a [`Message`] carries its content type from
//!   construction; no consumer ever downcasts.
//! - **Validated topics**: a [`TopicSet`] is never empty and never holds an
//!   empty topic.

pub mod address;
pub mod errors;
pub mod message;
pub mod security;
pub mod topics;

pub use address::{validate_port, Address, Role};
pub use errors::{BridgeError, ResultCode, TransportError};
pub use message::{ByteData, ContentType, Event, Message, Reading};
pub use security::{CurveKey, KeyMaterial};
pub use topics::{validate_topic, TopicSet};
