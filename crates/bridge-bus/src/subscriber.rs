//! # Subscriber Endpoint
//!
//! Owns one transport handle connected to a remote publisher. Messages
//! arriving on the transport's thread are rebuilt by the callback bridge and
//! handed to the caller's [`MessageListener`].

use crate::bridge::{MessageListener, SubscriberSink};
use crate::ports::{Transport, TransportHandle};
use crate::EndpointState;
use bridge_telemetry::TRANSPORT_ERRORS;
use bridge_types::{
    validate_topic, Address, BridgeError, CurveKey, KeyMaterial, Role, TopicSet, TransportError,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// A subscribing endpoint.
pub struct Subscriber {
    address: Address,
    handle: Box<dyn TransportHandle>,
    state: EndpointState,
}

impl Subscriber {
    /// Open a subscriber for `host:port`. Nothing is connected until
    /// [`Subscriber::start`].
    pub fn create(
        transport: &dyn Transport,
        host: &str,
        port: u16,
        listener: Arc<dyn MessageListener>,
    ) -> Result<Self, BridgeError> {
        let address = validate_address(host, port)?;
        let sink = Arc::new(SubscriberSink::new(listener));
        let handle = transport.open(Role::Subscriber, &address, sink)?;
        debug!(%address, "Subscriber created");
        Ok(Self {
            address,
            handle,
            state: EndpointState::Created,
        })
    }

    /// Install the client key pair. Must be called before start.
    pub fn set_client_keys(&mut self, secret: CurveKey, public: CurveKey) -> Result<(), BridgeError> {
        self.set_keys(KeyMaterial::ClientPair { secret, public })
    }

    /// Install the server's public key. Must be called before start.
    pub fn set_server_public_key(&mut self, key: CurveKey) -> Result<(), BridgeError> {
        self.set_keys(KeyMaterial::ServerPublic(key))
    }

    /// Connect to the configured publisher.
    pub fn start(&mut self) -> Result<(), BridgeError> {
        self.handle
            .start()
            .map_err(|e| self.transport_failure("start", e))?;
        self.state = EndpointState::Started;
        debug!(address = %self.address, "Subscriber started");
        Ok(())
    }

    /// Receive every message, regardless of topic.
    pub fn subscribe(&mut self) -> Result<(), BridgeError> {
        self.subscribe_scope(None)
    }

    /// Receive messages whose topic starts with `topic`.
    pub fn subscribe_topic(&mut self, topic: &str) -> Result<(), BridgeError> {
        let topic = validate_topic(topic)?;
        self.subscribe_scope(Some(topic))
    }

    /// Subscribe to each topic in order.
    pub fn subscribe_topics(&mut self, topics: &TopicSet) -> Result<(), BridgeError> {
        for topic in topics {
            self.subscribe_scope(Some(topic.as_str()))?;
        }
        Ok(())
    }

    /// Connect to another publisher at `host:port` and subscribe to `topic`
    /// there. The endpoint reports the new address afterwards.
    pub fn subscribe_at(&mut self, host: &str, port: u16, topic: &str) -> Result<(), BridgeError> {
        let address = validate_address(host, port)?;
        let topic = validate_topic(topic)?;

        self.handle
            .connect(&address)
            .map_err(|e| self.transport_failure("connect", e))?;
        self.subscribe_scope(Some(topic))?;

        debug!(from = %self.address, to = %address, topic, "Subscription source moved");
        self.address = address;
        Ok(())
    }

    /// Drop the catch-all subscription.
    pub fn unsubscribe(&mut self) -> Result<(), BridgeError> {
        self.unsubscribe_scope(None)
    }

    /// Drop one topic subscription.
    pub fn unsubscribe_topic(&mut self, topic: &str) -> Result<(), BridgeError> {
        let topic = validate_topic(topic)?;
        self.unsubscribe_scope(Some(topic))
    }

    /// Drop each topic subscription in order.
    pub fn unsubscribe_topics(&mut self, topics: &TopicSet) -> Result<(), BridgeError> {
        for topic in topics {
            self.unsubscribe_scope(Some(topic.as_str()))?;
        }
        Ok(())
    }

    /// Host of the current publisher.
    #[must_use]
    pub fn ip(&self) -> &str {
        self.address.host()
    }

    /// Port of the current publisher.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.address.port()
    }

    #[must_use]
    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Disconnect. A callback already running may finish after this returns.
    pub fn stop(&mut self) -> Result<(), BridgeError> {
        self.handle
            .stop()
            .map_err(|e| self.transport_failure("stop", e))?;
        self.state = EndpointState::Stopped;
        debug!(address = %self.address, "Subscriber stopped");
        Ok(())
    }

    /// Release the transport handle, then the endpoint.
    pub fn destroy(mut self) -> Result<(), BridgeError> {
        self.handle.close();
        debug!(address = %self.address, "Subscriber destroyed");
        Ok(())
    }

    fn set_keys(&mut self, material: KeyMaterial) -> Result<(), BridgeError> {
        if self.state != EndpointState::Created {
            return Err(BridgeError::AlreadyStarted);
        }
        self.handle
            .set_keys(&material)
            .map_err(|e| self.transport_failure("set_keys", e))
    }

    fn subscribe_scope(&mut self, topic: Option<&str>) -> Result<(), BridgeError> {
        self.handle
            .subscribe(topic)
            .map_err(|e| self.transport_failure("subscribe", e))?;
        debug!(address = %self.address, topic = ?topic, "Subscribed");
        Ok(())
    }

    fn unsubscribe_scope(&mut self, topic: Option<&str>) -> Result<(), BridgeError> {
        self.handle
            .unsubscribe(topic)
            .map_err(|e| self.transport_failure("unsubscribe", e))?;
        debug!(address = %self.address, topic = ?topic, "Unsubscribed");
        Ok(())
    }

    fn transport_failure(&self, operation: &'static str, error: TransportError) -> BridgeError {
        TRANSPORT_ERRORS.with_label_values(&[operation]).inc();
        warn!(address = %self.address, operation, error = %error, "Subscriber transport failure");
        BridgeError::Transport(error)
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.handle.close();
    }
}

fn validate_address(host: &str, port: u16) -> Result<Address, BridgeError> {
    if host.is_empty() {
        return Err(BridgeError::InvalidArgument("empty host".to_string()));
    }
    Ok(Address::new(host, port))
}
