//! # Publisher Endpoint
//!
//! Owns one transport handle bound to a port and routes each message to the
//! send path matching its content type.

use crate::bridge::{LifecycleListener, PublisherSink};
use crate::ports::{Transport, TransportHandle};
use crate::EndpointState;
use bridge_telemetry::{MESSAGES_PUBLISHED, TRANSPORT_ERRORS};
use bridge_types::{
    validate_topic, Address, BridgeError, ContentType, CurveKey, KeyMaterial, Message, Role,
    TopicSet, TransportError,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// A publishing endpoint.
///
/// Consumed by [`Publisher::destroy`], so the transport handle is released
/// exactly once.
pub struct Publisher {
    port: u16,
    handle: Box<dyn TransportHandle>,
    state: EndpointState,
}

impl Publisher {
    /// Open an unbound publisher for `port`.
    ///
    /// `listener` receives start/stop/error notifications on the transport's
    /// thread.
    pub fn create(
        transport: &dyn Transport,
        port: u16,
        listener: Arc<dyn LifecycleListener>,
    ) -> Result<Self, BridgeError> {
        let sink = Arc::new(PublisherSink::new(listener));
        let handle = transport.open(Role::Publisher, &Address::any(port), sink)?;
        debug!(port, "Publisher created");
        Ok(Self {
            port,
            handle,
            state: EndpointState::Created,
        })
    }

    /// Install the server secret key. Must be called before [`Publisher::start`].
    pub fn set_server_secret_key(&mut self, key: CurveKey) -> Result<(), BridgeError> {
        if self.state != EndpointState::Created {
            return Err(BridgeError::AlreadyStarted);
        }
        let material = KeyMaterial::ServerSecret(key);
        self.handle
            .set_keys(&material)
            .map_err(|e| self.transport_failure("set_keys", e))
    }

    /// Bind the transport to the configured port.
    pub fn start(&mut self) -> Result<(), BridgeError> {
        self.handle
            .start()
            .map_err(|e| self.transport_failure("start", e))?;
        self.state = EndpointState::Started;
        debug!(port = self.port, "Publisher started");
        Ok(())
    }

    /// Publish without a topic.
    pub fn publish(&mut self, message: &Message) -> Result<(), BridgeError> {
        self.dispatch(&[None], message)
    }

    /// Publish on a single topic.
    pub fn publish_on_topic(&mut self, topic: &str, message: &Message) -> Result<(), BridgeError> {
        let topic = validate_topic(topic)?;
        self.dispatch(&[Some(topic)], message)
    }

    /// Publish once per topic, in order. Stops at the first failure.
    pub fn publish_on_topics(
        &mut self,
        topics: &TopicSet,
        message: &Message,
    ) -> Result<(), BridgeError> {
        let scopes: Vec<Option<&str>> = topics.iter().map(Some).collect();
        self.dispatch(&scopes, message)
    }

    /// Port the publisher binds to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Unbind from the port.
    pub fn stop(&mut self) -> Result<(), BridgeError> {
        self.handle
            .stop()
            .map_err(|e| self.transport_failure("stop", e))?;
        self.state = EndpointState::Stopped;
        debug!(port = self.port, "Publisher stopped");
        Ok(())
    }

    /// Release the transport handle, then the endpoint.
    pub fn destroy(mut self) -> Result<(), BridgeError> {
        self.handle.close();
        debug!(port = self.port, "Publisher destroyed");
        Ok(())
    }

    fn dispatch(&mut self, scopes: &[Option<&str>], message: &Message) -> Result<(), BridgeError> {
        match message {
            Message::Event(event) => {
                let payload = event.encode()?;
                self.send_all(scopes, ContentType::Event, &payload)
            }
            Message::ByteData(data) => self.send_all(scopes, ContentType::ByteData, data.data()),
        }
    }

    fn send_all(
        &mut self,
        scopes: &[Option<&str>],
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<(), BridgeError> {
        for topic in scopes {
            self.handle
                .send(*topic, content_type, payload)
                .map_err(|e| self.transport_failure("send", e))?;

            let scope = if topic.is_some() { "topic" } else { "untopiced" };
            MESSAGES_PUBLISHED
                .with_label_values(&[content_type.as_str(), scope])
                .inc();
            debug!(
                port = self.port,
                topic = ?topic,
                content_type = content_type.as_str(),
                bytes = payload.len(),
                "Message published"
            );
        }
        Ok(())
    }

    fn transport_failure(&self, operation: &'static str, error: TransportError) -> BridgeError {
        TRANSPORT_ERRORS.with_label_values(&[operation]).inc();
        warn!(port = self.port, operation, error = %error, "Publisher transport failure");
        BridgeError::Transport(error)
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.handle.close();
    }
}
