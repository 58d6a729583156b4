//! # Memory Transport
//!
//! In-process implementation of the transport port.
//!
//! Each port is a `tokio::sync::broadcast` channel. Publishers claim a port by
//! binding it; subscribers attach a receiver to it (before or after the
//! publisher binds) and run one delivery thread per connection, which is the
//! thread listener callbacks execute on.
//!
//! ## Semantics
//!
//! - Sends without receivers succeed; delivery is best effort.
//! - A topic subscription matches every topic it is a prefix of; the
//!   catch-all subscription matches every message, topiced or not.
//! - Topics are limited to ASCII alphanumerics and `-_./`.
//! - Keys must be 40-character Z85 strings. A publisher with a server secret
//!   key only reaches subscribers that configured a server public key, and
//!   vice versa.
//! - A subscriber that falls more than the channel capacity behind loses the
//!   oldest frames.

use crate::ports::{Delivery, Notification, Transport, TransportHandle, TransportSink};
use crate::DEFAULT_CHANNEL_CAPACITY;
use bridge_telemetry::MESSAGES_DROPPED;
use bridge_types::{Address, ContentType, CurveKey, KeyMaterial, Role, TransportError};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::env;
use std::sync::Arc;
use std::thread;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Memory transport settings.
#[derive(Debug, Clone)]
pub struct MemoryTransportConfig {
    /// Frames buffered per port before slow subscribers start losing them.
    pub channel_capacity: usize,
}

impl Default for MemoryTransportConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl MemoryTransportConfig {
    /// Read `BRIDGE_CHANNEL_CAPACITY`, falling back to the default.
    pub fn from_env() -> Self {
        Self {
            channel_capacity: env::var("BRIDGE_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|c: &usize| *c > 0)
                .unwrap_or(DEFAULT_CHANNEL_CAPACITY),
        }
    }
}

/// True when `topic` only uses characters the transport accepts.
#[must_use]
pub fn is_valid_topic(topic: &str) -> bool {
    !topic.is_empty()
        && topic
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'/'))
}

fn check_topic(topic: Option<&str>) -> Result<(), TransportError> {
    match topic {
        Some(t) if !is_valid_topic(t) => Err(TransportError::InvalidTopic(t.to_string())),
        _ => Ok(()),
    }
}

fn check_key(key: &CurveKey, which: &'static str) -> Result<(), TransportError> {
    if key.is_z85() {
        Ok(())
    } else {
        Err(TransportError::InvalidKey(format!(
            "{which} must be 40 Z85 characters"
        )))
    }
}

/// One frame on a port channel.
#[derive(Debug, Clone)]
struct Frame {
    topic: Option<Arc<str>>,
    tag: u32,
    payload: Arc<[u8]>,
    secured: bool,
}

struct PortChannel {
    sender: broadcast::Sender<Frame>,
    owner: Option<Uuid>,
}

/// Port table shared by every handle of one transport.
struct Network {
    capacity: usize,
    ports: RwLock<HashMap<u16, PortChannel>>,
}

impl Network {
    fn with_channel<R>(&self, port: u16, f: impl FnOnce(&mut PortChannel) -> R) -> R {
        let mut ports = self.ports.write();
        let channel = ports.entry(port).or_insert_with(|| PortChannel {
            sender: broadcast::channel(self.capacity).0,
            owner: None,
        });
        f(channel)
    }

    fn bind(&self, port: u16, owner: Uuid) -> Result<broadcast::Sender<Frame>, TransportError> {
        self.with_channel(port, |channel| match channel.owner {
            Some(existing) if existing != owner => Err(TransportError::AddressInUse { port }),
            _ => {
                channel.owner = Some(owner);
                Ok(channel.sender.clone())
            }
        })
    }

    fn unbind(&self, port: u16, owner: Uuid) {
        {
            let mut ports = self.ports.write();
            if let Some(channel) = ports.get_mut(&port) {
                if channel.owner == Some(owner) {
                    channel.owner = None;
                }
            }
        }
        self.release(port);
    }

    /// Drop the port entry once it has neither an owner nor receivers.
    fn release(&self, port: u16) {
        let mut ports = self.ports.write();
        let unused = ports
            .get(&port)
            .is_some_and(|channel| channel.owner.is_none() && channel.sender.receiver_count() == 0);
        if unused {
            ports.remove(&port);
            trace!(port, "Port entry released");
        }
    }

    fn connect(&self, port: u16) -> broadcast::Receiver<Frame> {
        self.with_channel(port, |channel| channel.sender.subscribe())
    }
}

/// In-process transport.
#[derive(Clone)]
pub struct MemoryTransport {
    network: Arc<Network>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MemoryTransportConfig::default())
    }

    #[must_use]
    pub fn with_config(config: MemoryTransportConfig) -> Self {
        Self {
            network: Arc::new(Network {
                capacity: config.channel_capacity.max(1),
                ports: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Ports currently bound by a publisher.
    #[must_use]
    pub fn bound_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .network
            .ports
            .read()
            .iter()
            .filter(|(_, channel)| channel.owner.is_some())
            .map(|(port, _)| *port)
            .collect();
        ports.sort_unstable();
        ports
    }

    /// Receivers attached to `port`.
    #[must_use]
    pub fn receiver_count(&self, port: u16) -> usize {
        self.network
            .ports
            .read()
            .get(&port)
            .map_or(0, |channel| channel.sender.receiver_count())
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn open(
        &self,
        role: Role,
        address: &Address,
        sink: Arc<dyn TransportSink>,
    ) -> Result<Box<dyn TransportHandle>, TransportError> {
        let id = Uuid::new_v4();
        debug!(%id, ?role, %address, "Memory transport handle opened");
        Ok(match role {
            Role::Publisher => Box::new(MemoryPublisher {
                id,
                network: self.network.clone(),
                port: address.port(),
                sink,
                sender: None,
                secret: None,
                closed: false,
            }),
            Role::Subscriber => Box::new(MemorySubscriber {
                network: self.network.clone(),
                address: address.clone(),
                sink,
                filter: Arc::new(RwLock::new(TopicFilter::default())),
                client_pair: None,
                server_public: None,
                connections: Vec::new(),
                started: false,
                closed: false,
            }),
        })
    }
}

struct MemoryPublisher {
    id: Uuid,
    network: Arc<Network>,
    port: u16,
    sink: Arc<dyn TransportSink>,
    sender: Option<broadcast::Sender<Frame>>,
    secret: Option<CurveKey>,
    closed: bool,
}

impl TransportHandle for MemoryPublisher {
    fn start(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.sender.is_some() {
            return Ok(());
        }
        match self.network.bind(self.port, self.id) {
            Ok(sender) => {
                self.sender = Some(sender);
                self.sink.notify(Notification::Started);
                Ok(())
            }
            Err(e) => {
                self.sink.notify(Notification::Errored(e.clone()));
                Err(e)
            }
        }
    }

    fn connect(&mut self, _address: &Address) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("publishers do not connect"))
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        if self.sender.take().is_some() {
            self.network.unbind(self.port, self.id);
            self.sink.notify(Notification::Stopped);
        }
        Ok(())
    }

    fn set_keys(&mut self, keys: &KeyMaterial) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        match keys {
            KeyMaterial::ServerSecret(key) => {
                check_key(key, "server secret key")?;
                self.secret = Some(key.clone());
                Ok(())
            }
            _ => Err(TransportError::Unsupported(
                "publishers only accept a server secret key",
            )),
        }
    }

    fn send(
        &mut self,
        topic: Option<&str>,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let sender = self.sender.as_ref().ok_or(TransportError::NotBound)?;
        check_topic(topic)?;

        let frame = Frame {
            topic: topic.map(Arc::from),
            tag: content_type.tag(),
            payload: Arc::from(payload),
            secured: self.secret.is_some(),
        };
        match sender.send(frame) {
            Ok(receivers) => trace!(port = self.port, receivers, "Frame sent"),
            Err(_) => debug!(port = self.port, topic = ?topic, "Frame sent with no receivers"),
        }
        Ok(())
    }

    fn subscribe(&mut self, _topic: Option<&str>) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("publishers do not subscribe"))
    }

    fn unsubscribe(&mut self, _topic: Option<&str>) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("publishers do not subscribe"))
    }

    fn close(&mut self) {
        if !self.closed {
            let _ = self.stop();
            self.closed = true;
            debug!(id = %self.id, port = self.port, "Memory publisher closed");
        }
    }
}

impl Drop for MemoryPublisher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Topic subscriptions of one subscriber handle.
#[derive(Debug, Default)]
struct TopicFilter {
    all: bool,
    prefixes: HashSet<String>,
}

impl TopicFilter {
    fn add(&mut self, topic: Option<&str>) {
        match topic {
            None => self.all = true,
            Some(t) => {
                self.prefixes.insert(t.to_string());
            }
        }
    }

    fn remove(&mut self, topic: Option<&str>) {
        match topic {
            None => self.all = false,
            Some(t) => {
                self.prefixes.remove(t);
            }
        }
    }

    fn matches(&self, topic: Option<&str>) -> bool {
        if self.all {
            return true;
        }
        topic.is_some_and(|t| self.prefixes.iter().any(|p| t.starts_with(p.as_str())))
    }
}

struct Connection {
    port: u16,
    shutdown: watch::Sender<bool>,
}

struct MemorySubscriber {
    network: Arc<Network>,
    address: Address,
    sink: Arc<dyn TransportSink>,
    filter: Arc<RwLock<TopicFilter>>,
    client_pair: Option<(CurveKey, CurveKey)>,
    server_public: Option<CurveKey>,
    connections: Vec<Connection>,
    started: bool,
    closed: bool,
}

impl MemorySubscriber {
    fn attach(&mut self, port: u16) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.connections.iter().any(|c| c.port == port) {
            return Ok(());
        }

        let receiver = self.network.connect(port);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let secured = self.server_public.is_some();
        spawn_delivery(
            self.network.clone(),
            port,
            receiver,
            shutdown_rx,
            self.filter.clone(),
            self.sink.clone(),
            secured,
        )
        .map_err(|e| TransportError::Io(e.to_string()))?;

        self.connections.push(Connection { port, shutdown });
        debug!(port, secured, "Memory subscriber attached");
        Ok(())
    }
}

impl TransportHandle for MemorySubscriber {
    fn start(&mut self) -> Result<(), TransportError> {
        let port = self.address.port();
        self.attach(port)?;
        self.started = true;
        self.sink.notify(Notification::Started);
        Ok(())
    }

    fn connect(&mut self, address: &Address) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if !self.started {
            return Err(TransportError::NotConnected);
        }
        self.attach(address.port())
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        if !self.started {
            return Ok(());
        }
        self.started = false;
        for connection in self.connections.drain(..) {
            // The delivery thread may already be gone.
            let _ = connection.shutdown.send(true);
        }
        self.sink.notify(Notification::Stopped);
        Ok(())
    }

    fn set_keys(&mut self, keys: &KeyMaterial) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        match keys {
            KeyMaterial::ClientPair { secret, public } => {
                check_key(secret, "client secret key")?;
                check_key(public, "client public key")?;
                self.client_pair = Some((secret.clone(), public.clone()));
                Ok(())
            }
            KeyMaterial::ServerPublic(key) => {
                check_key(key, "server public key")?;
                self.server_public = Some(key.clone());
                Ok(())
            }
            KeyMaterial::ServerSecret(_) => Err(TransportError::Unsupported(
                "subscribers do not accept a server secret key",
            )),
        }
    }

    fn send(
        &mut self,
        _topic: Option<&str>,
        _content_type: ContentType,
        _payload: &[u8],
    ) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("subscribers do not send"))
    }

    fn subscribe(&mut self, topic: Option<&str>) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        check_topic(topic)?;
        self.filter.write().add(topic);
        Ok(())
    }

    fn unsubscribe(&mut self, topic: Option<&str>) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        check_topic(topic)?;
        self.filter.write().remove(topic);
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            let _ = self.stop();
            self.closed = true;
            debug!(address = %self.address, "Memory subscriber closed");
        }
    }
}

impl Drop for MemorySubscriber {
    fn drop(&mut self) {
        self.close();
    }
}

/// Run the delivery loop for one connection on its own thread.
fn spawn_delivery(
    network: Arc<Network>,
    port: u16,
    mut receiver: broadcast::Receiver<Frame>,
    mut shutdown: watch::Receiver<bool>,
    filter: Arc<RwLock<TopicFilter>>,
    sink: Arc<dyn TransportSink>,
    secured: bool,
) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread().build()?;

    thread::Builder::new()
        .name(format!("bridge-delivery-{port}"))
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => break,
                        received = receiver.recv() => match received {
                            Ok(frame) => deliver_frame(&frame, &filter, sink.as_ref(), secured),
                            Err(RecvError::Lagged(skipped)) => {
                                warn!(port, skipped, "Subscriber lagged, frames dropped");
                                MESSAGES_DROPPED
                                    .with_label_values(&["lagged"])
                                    .inc_by(skipped as f64);
                            }
                            Err(RecvError::Closed) => break,
                        },
                    }
                }
            });
            network.release(port);
            debug!(port, "Delivery loop exited");
        })?;
    Ok(())
}

fn deliver_frame(
    frame: &Frame,
    filter: &RwLock<TopicFilter>,
    sink: &dyn TransportSink,
    secured: bool,
) {
    if frame.secured != secured {
        trace!(frame_secured = frame.secured, secured, "Security mismatch, frame skipped");
        return;
    }
    let topic = frame.topic.as_deref();
    let matched = filter.read().matches(topic);
    if !matched {
        return;
    }
    sink.deliver(Delivery {
        topic,
        tag: frame.tag,
        payload: &frame.payload[..],
    });
}
