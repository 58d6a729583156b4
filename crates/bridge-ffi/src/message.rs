//! C views of messages and the callback adapters that produce them.

use bridge_bus::{LifecycleListener, MessageListener};
use bridge_telemetry::MESSAGES_DROPPED;
use bridge_types::{BridgeError, ContentType, Message, ResultCode};
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;
use tracing::warn;

/// Content-type tag of a structured event (JSON encoded).
pub const BRIDGE_CONTENT_TYPE_EVENT: u32 = ContentType::Event.tag();
/// Content-type tag of raw bytes.
pub const BRIDGE_CONTENT_TYPE_BYTEDATA: u32 = ContentType::ByteData.tag();

/// Borrowed message view passed across the boundary.
///
/// Incoming views are copied before the call returns. Outgoing views are only
/// valid for the duration of the callback they are passed to.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BridgeMessage {
    pub content_type: u32,
    pub payload: *const u8,
    pub payload_len: usize,
}

impl BridgeMessage {
    /// View over `payload` tagged with `content_type`.
    #[must_use]
    pub fn view(content_type: u32, payload: &[u8]) -> Self {
        Self {
            content_type,
            payload: payload.as_ptr(),
            payload_len: payload.len(),
        }
    }

    /// Rebuild an owned [`Message`] from a caller's view.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a valid `BridgeMessage` whose payload is
    /// readable for `payload_len` bytes.
    pub(crate) unsafe fn read(ptr: *const Self) -> Result<Message, BridgeError> {
        let view = ptr.as_ref().ok_or(BridgeError::NullArgument("message"))?;
        let payload = if view.payload_len == 0 {
            &[][..]
        } else if view.payload.is_null() {
            return Err(BridgeError::NullArgument("message payload"));
        } else {
            std::slice::from_raw_parts(view.payload, view.payload_len)
        };
        Message::from_parts(view.content_type, payload)
    }
}

/// Publisher lifecycle callback.
pub type LifecycleCallback = Option<extern "C" fn(code: ResultCode)>;

/// Callback for messages published without a topic.
pub type MessageCallback = Option<extern "C" fn(message: *const BridgeMessage, content_type: u32)>;

/// Callback for messages published on a topic.
pub type TopicMessageCallback = Option<
    extern "C" fn(topic: *const c_char, message: *const BridgeMessage, content_type: u32),
>;

/// Forwards lifecycle notifications to C function pointers.
pub(crate) struct CLifecycleListener {
    pub(crate) on_start: LifecycleCallback,
    pub(crate) on_stop: LifecycleCallback,
    pub(crate) on_error: LifecycleCallback,
}

impl LifecycleListener for CLifecycleListener {
    fn on_start(&self, code: ResultCode) {
        if let Some(cb) = self.on_start {
            cb(code);
        }
    }

    fn on_stop(&self, code: ResultCode) {
        if let Some(cb) = self.on_stop {
            cb(code);
        }
    }

    fn on_error(&self, code: ResultCode) {
        if let Some(cb) = self.on_error {
            cb(code);
        }
    }
}

/// Forwards received messages to C function pointers.
pub(crate) struct CMessageListener {
    pub(crate) on_message: MessageCallback,
    pub(crate) on_topic_message: TopicMessageCallback,
}

impl MessageListener for CMessageListener {
    fn on_message(&self, message: &Message) {
        let Some(cb) = self.on_message else {
            no_listener();
            return;
        };
        with_view(message, |view, tag| cb(view, tag));
    }

    fn on_topic_message(&self, topic: &str, message: &Message) {
        let Some(cb) = self.on_topic_message else {
            no_listener();
            return;
        };
        let Ok(topic) = CString::new(topic) else {
            warn!(topic, "Topic contains NUL, message dropped");
            return;
        };
        with_view(message, |view, tag| cb(topic.as_ptr(), view, tag));
    }
}

fn no_listener() {
    MESSAGES_DROPPED.with_label_values(&["no_listener"]).inc();
}

fn with_view(message: &Message, f: impl FnOnce(*const BridgeMessage, u32)) {
    let payload = match message.payload() {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Message could not be encoded for delivery");
            return;
        }
    };
    let tag = message.content_type().tag();
    let view = BridgeMessage::view(tag, &payload);
    f(ptr::addr_of!(view), tag);
}
