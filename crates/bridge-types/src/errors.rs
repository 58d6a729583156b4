//! # Error Types
//!
//! The closed result-code taxonomy returned across the C ABI, and the typed
//! errors that the Rust API reports before they are collapsed into it.

use crate::message::ContentType;
use thiserror::Error;

/// Result code returned by every fallible operation.
///
/// The numeric values are part of the published ABI. Values 0 through 3 are
/// frozen; new codes are only ever appended.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// The operation succeeded.
    Ok = 0,
    /// Generic transport-layer failure, including key rejection.
    Error = 1,
    /// A topic list was empty or contained an empty topic.
    InvalidTopicList = 2,
    /// A message tag was not recognized by the dispatch path.
    InvalidContentType = 3,
    /// A required pointer, string or handle was null.
    NullArgument = 4,
    /// An argument was out of range (e.g. a negative port).
    InvalidArgument = 5,
}

impl ResultCode {
    /// Returns true for [`ResultCode::Ok`].
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Collapse an operation result into its code.
    #[must_use]
    pub fn of<T>(result: &Result<T, BridgeError>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(e) => Self::from(e),
        }
    }
}

/// Failures reported by a transport implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Another endpoint already holds the port.
    #[error("Address already in use: port {port}")]
    AddressInUse { port: u16 },

    /// A publishing operation was attempted on an unbound handle.
    #[error("Transport handle is not bound")]
    NotBound,

    /// A subscribing operation was attempted on an unconnected handle.
    #[error("Transport handle is not connected")]
    NotConnected,

    /// Key material was rejected.
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// The topic contains characters the transport does not accept.
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    /// The operation does not apply to this handle's role.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The handle has already been closed.
    #[error("Transport handle closed")]
    Closed,

    /// Failure of the underlying I/O machinery.
    #[error("Transport I/O error: {0}")]
    Io(String),
}

/// Errors from endpoint operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// A required argument was null.
    #[error("Required argument is null: {0}")]
    NullArgument(&'static str),

    /// An argument was out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A topic list with zero entries.
    #[error("Topic list is empty")]
    EmptyTopicList,

    /// A topic with zero characters.
    #[error("Topic is empty")]
    EmptyTopic,

    /// The content-type tag matches no known message case.
    #[error("Unrecognized content type tag: {0}")]
    InvalidContentType(u32),

    /// The message holds a different case than the one requested.
    #[error("Content type mismatch: expected {expected:?}, found {found:?}")]
    ContentTypeMismatch {
        expected: ContentType,
        found: ContentType,
    },

    /// The payload does not decode as its declared case.
    #[error("Payload does not decode as {content_type:?}: {reason}")]
    MalformedPayload {
        content_type: ContentType,
        reason: String,
    },

    /// Key material may only be configured before start.
    #[error("Endpoint already started; keys must be set before start")]
    AlreadyStarted,

    /// The handle token does not name a live endpoint.
    #[error("Unknown or destroyed handle: {0}")]
    StaleHandle(u64),

    /// The transport rejected the operation.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<&BridgeError> for ResultCode {
    fn from(error: &BridgeError) -> Self {
        match error {
            BridgeError::NullArgument(_) | BridgeError::StaleHandle(_) => Self::NullArgument,
            BridgeError::InvalidArgument(_) => Self::InvalidArgument,
            BridgeError::EmptyTopicList | BridgeError::EmptyTopic => Self::InvalidTopicList,
            BridgeError::InvalidContentType(_)
            | BridgeError::ContentTypeMismatch { .. }
            | BridgeError::MalformedPayload { .. } => Self::InvalidContentType,
            BridgeError::AlreadyStarted | BridgeError::Transport(_) => Self::Error,
        }
    }
}

impl From<BridgeError> for ResultCode {
    fn from(error: BridgeError) -> Self {
        Self::from(&error)
    }
}
