//! # Callback Bridge
//!
//! Adapts transport notifications and deliveries to caller listeners.
//!
//! Both adaptation functions are stateless: they take the transport's value
//! and the caller's listener as parameters. Listeners run synchronously on the
//! transport's delivery thread, so they must be thread-safe and must not
//! block.
//!
//! ## Delivery policy
//!
//! | Delivery | Listener method |
//! |----------|-----------------|
//! | no topic | [`MessageListener::on_message`] |
//! | topic | [`MessageListener::on_topic_message`] |
//! | unknown tag | none (dropped) |
//! | payload does not decode | none (dropped) |

use crate::ports::{Delivery, Notification, TransportSink};
use bridge_telemetry::{MESSAGES_DELIVERED, MESSAGES_DROPPED};
use bridge_types::{BridgeError, ContentType, Message, ResultCode};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Receives publisher lifecycle notifications.
pub trait LifecycleListener: Send + Sync {
    fn on_start(&self, _code: ResultCode) {}
    fn on_stop(&self, _code: ResultCode) {}
    fn on_error(&self, _code: ResultCode) {}
}

/// Receives reconstructed messages on a subscriber.
///
/// The message reference is only valid for the duration of the call.
pub trait MessageListener: Send + Sync {
    fn on_message(&self, _message: &Message) {}
    fn on_topic_message(&self, _topic: &str, _message: &Message) {}
}

/// Listener that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl LifecycleListener for NoopListener {}
impl MessageListener for NoopListener {}

/// Why a delivery did not reach a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    UnknownContentType,
    MalformedPayload,
}

impl DropReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownContentType => "unknown_content_type",
            Self::MalformedPayload => "malformed_payload",
        }
    }
}

/// Result of dispatching one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered(ContentType),
    Dropped(DropReason),
}

/// Pass a lifecycle notification through to `listener`.
pub fn forward_lifecycle(notification: &Notification, listener: &dyn LifecycleListener) {
    match notification {
        Notification::Started => listener.on_start(ResultCode::Ok),
        Notification::Stopped => listener.on_stop(ResultCode::Ok),
        Notification::Errored(e) => {
            let code = ResultCode::from(BridgeError::Transport(e.clone()));
            listener.on_error(code);
        }
    }
}

/// Rebuild the message carried by `delivery` and hand it to `listener`.
pub fn dispatch_delivery(delivery: Delivery<'_>, listener: &dyn MessageListener) -> DispatchOutcome {
    let message = match Message::from_parts(delivery.tag, delivery.payload) {
        Ok(message) => message,
        Err(BridgeError::InvalidContentType(tag)) => {
            debug!(tag, topic = ?delivery.topic, "Dropping message with unknown content type");
            return dropped(DropReason::UnknownContentType);
        }
        Err(e) => {
            warn!(topic = ?delivery.topic, error = %e, "Dropping undecodable message");
            return dropped(DropReason::MalformedPayload);
        }
    };

    let content_type = message.content_type();
    let scope = match delivery.topic {
        Some(topic) => {
            listener.on_topic_message(topic, &message);
            "topic"
        }
        None => {
            listener.on_message(&message);
            "untopiced"
        }
    };

    MESSAGES_DELIVERED
        .with_label_values(&[content_type.as_str(), scope])
        .inc();
    trace!(content_type = content_type.as_str(), scope, "Message delivered");
    DispatchOutcome::Delivered(content_type)
}

fn dropped(reason: DropReason) -> DispatchOutcome {
    MESSAGES_DROPPED.with_label_values(&[reason.as_str()]).inc();
    DispatchOutcome::Dropped(reason)
}

/// Sink installed on publisher handles.
pub(crate) struct PublisherSink {
    listener: Arc<dyn LifecycleListener>,
}

impl PublisherSink {
    pub(crate) fn new(listener: Arc<dyn LifecycleListener>) -> Self {
        Self { listener }
    }
}

impl TransportSink for PublisherSink {
    fn notify(&self, notification: Notification) {
        forward_lifecycle(&notification, self.listener.as_ref());
    }

    fn deliver(&self, _delivery: Delivery<'_>) {
        debug!("Publisher handle received a message; ignoring");
    }
}

/// Sink installed on subscriber handles.
pub(crate) struct SubscriberSink {
    listener: Arc<dyn MessageListener>,
}

impl SubscriberSink {
    pub(crate) fn new(listener: Arc<dyn MessageListener>) -> Self {
        Self { listener }
    }
}

impl TransportSink for SubscriberSink {
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::Errored(e) => warn!(error = %e, "Subscriber transport error"),
            other => debug!(notification = ?other, "Subscriber lifecycle"),
        }
    }

    fn deliver(&self, delivery: Delivery<'_>) {
        dispatch_delivery(delivery, self.listener.as_ref());
    }
}
