//! Recording transport for unit tests.

use crate::ports::{Notification, Transport, TransportHandle, TransportSink};
use bridge_types::{Address, ContentType, KeyMaterial, Role, TransportError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything a recording handle was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start,
    Connect(Address),
    Stop,
    SetKeys(&'static str),
    Send {
        topic: Option<String>,
        content_type: ContentType,
        payload: Vec<u8>,
    },
    Subscribe(Option<String>),
    Unsubscribe(Option<String>),
    Close,
}

/// Transport whose handles only record calls.
#[derive(Default, Clone)]
pub struct RecordingTransport {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub opened: Arc<Mutex<Vec<(Role, Address)>>>,
    /// When set, `set_keys` fails with this error.
    pub reject_keys: Arc<Mutex<Option<TransportError>>>,
    /// When set, `send` fails with this error.
    pub reject_send: Arc<Mutex<Option<TransportError>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn sends(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Send { .. }))
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Close))
            .count()
    }
}

impl Transport for RecordingTransport {
    fn open(
        &self,
        role: Role,
        address: &Address,
        sink: Arc<dyn TransportSink>,
    ) -> Result<Box<dyn TransportHandle>, TransportError> {
        self.opened.lock().push((role, address.clone()));
        Ok(Box::new(RecordingHandle {
            transport: self.clone(),
            sink,
            closed: false,
        }))
    }
}

struct RecordingHandle {
    transport: RecordingTransport,
    sink: Arc<dyn TransportSink>,
    closed: bool,
}

impl RecordingHandle {
    fn record(&self, call: Call) {
        self.transport.calls.lock().push(call);
    }
}

impl TransportHandle for RecordingHandle {
    fn start(&mut self) -> Result<(), TransportError> {
        self.record(Call::Start);
        self.sink.notify(Notification::Started);
        Ok(())
    }

    fn connect(&mut self, address: &Address) -> Result<(), TransportError> {
        self.record(Call::Connect(address.clone()));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        self.record(Call::Stop);
        self.sink.notify(Notification::Stopped);
        Ok(())
    }

    fn set_keys(&mut self, keys: &KeyMaterial) -> Result<(), TransportError> {
        if let Some(e) = self.transport.reject_keys.lock().clone() {
            return Err(e);
        }
        self.record(Call::SetKeys(keys.kind()));
        Ok(())
    }

    fn send(
        &mut self,
        topic: Option<&str>,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        if let Some(e) = self.transport.reject_send.lock().clone() {
            return Err(e);
        }
        self.record(Call::Send {
            topic: topic.map(str::to_string),
            content_type,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn subscribe(&mut self, topic: Option<&str>) -> Result<(), TransportError> {
        self.record(Call::Subscribe(topic.map(str::to_string)));
        Ok(())
    }

    fn unsubscribe(&mut self, topic: Option<&str>) -> Result<(), TransportError> {
        self.record(Call::Unsubscribe(topic.map(str::to_string)));
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.record(Call::Close);
        }
    }
}
