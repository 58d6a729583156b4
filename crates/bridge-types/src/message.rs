//! # Message Variant
//!
//! A closed set of payload shapes. The content-type tag is fixed when the
//! message is built, and every consumer matches on it instead of guessing.
//!
//! | Tag | Case | Payload on the wire |
//! |-----|------|---------------------|
//! | 0 | [`Message::Event`] | encoded [`Event`] |
//! | 1 | [`Message::ByteData`] | raw bytes |
//!
//! Tags 2 (AML) and 3 (JSON) are reserved by the protocol and are rejected
//! like any other unknown tag.

use crate::errors::BridgeError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Discriminator identifying the payload shape of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    /// Structured event.
    Event,
    /// Opaque byte payload.
    ByteData,
}

impl ContentType {
    /// Numeric tag used on the wire and across the C ABI.
    #[must_use]
    pub const fn tag(self) -> u32 {
        match self {
            Self::Event => 0,
            Self::ByteData => 1,
        }
    }

    /// Resolve a numeric tag.
    pub fn from_tag(tag: u32) -> Result<Self, BridgeError> {
        match tag {
            0 => Ok(Self::Event),
            1 => Ok(Self::ByteData),
            other => Err(BridgeError::InvalidContentType(other)),
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::ByteData => "byte_data",
        }
    }
}

impl TryFrom<u32> for ContentType {
    type Error = BridgeError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        Self::from_tag(tag)
    }
}

/// A single named value carried by an [`Event`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub id: String,
    pub created: i64,
    pub modified: i64,
    pub origin: i64,
    pub device: String,
    pub name: String,
    pub value: String,
}

/// Structured event: device metadata plus an ordered list of readings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub created: i64,
    pub modified: i64,
    pub origin: i64,
    pub device: String,
    pub readings: Vec<Reading>,
}

impl Event {
    /// Encode for the wire.
    pub fn encode(&self) -> Result<Vec<u8>, BridgeError> {
        serde_json::to_vec(self).map_err(|e| BridgeError::MalformedPayload {
            content_type: ContentType::Event,
            reason: e.to_string(),
        })
    }

    /// Decode from the wire.
    pub fn decode(bytes: &[u8]) -> Result<Self, BridgeError> {
        serde_json::from_slice(bytes).map_err(|e| BridgeError::MalformedPayload {
            content_type: ContentType::Event,
            reason: e.to_string(),
        })
    }
}

/// Opaque byte payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteData(Vec<u8>);

impl ByteData {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ByteData {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl From<&[u8]> for ByteData {
    fn from(data: &[u8]) -> Self {
        Self(data.to_vec())
    }
}

impl From<&str> for ByteData {
    fn from(data: &str) -> Self {
        Self(data.as_bytes().to_vec())
    }
}

/// A message that can be published or delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Event(Event),
    ByteData(ByteData),
}

impl Message {
    /// The tag fixed at construction.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Event(_) => ContentType::Event,
            Self::ByteData(_) => ContentType::ByteData,
        }
    }

    /// Rebuild a message from its tag and encoded payload.
    ///
    /// Fails with [`BridgeError::InvalidContentType`] for an unknown tag and
    /// [`BridgeError::MalformedPayload`] when an event payload does not decode.
    pub fn from_parts(tag: u32, payload: &[u8]) -> Result<Self, BridgeError> {
        match ContentType::from_tag(tag)? {
            ContentType::Event => Event::decode(payload).map(Self::Event),
            ContentType::ByteData => Ok(Self::ByteData(ByteData::from(payload))),
        }
    }

    /// Encoded payload. Byte data is borrowed as-is.
    pub fn payload(&self) -> Result<Cow<'_, [u8]>, BridgeError> {
        match self {
            Self::Event(event) => event.encode().map(Cow::Owned),
            Self::ByteData(data) => Ok(Cow::Borrowed(data.data())),
        }
    }

    /// Interpret as a structured event.
    pub fn as_event(&self) -> Result<&Event, BridgeError> {
        match self {
            Self::Event(event) => Ok(event),
            Self::ByteData(_) => Err(BridgeError::ContentTypeMismatch {
                expected: ContentType::Event,
                found: ContentType::ByteData,
            }),
        }
    }

    /// Interpret as a byte payload.
    pub fn as_byte_data(&self) -> Result<&ByteData, BridgeError> {
        match self {
            Self::ByteData(data) => Ok(data),
            Self::Event(_) => Err(BridgeError::ContentTypeMismatch {
                expected: ContentType::ByteData,
                found: ContentType::Event,
            }),
        }
    }
}

impl From<Event> for Message {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

impl From<ByteData> for Message {
    fn from(data: ByteData) -> Self {
        Self::ByteData(data)
    }
}
