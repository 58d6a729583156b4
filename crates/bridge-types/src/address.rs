//! Endpoint addressing.

use crate::errors::BridgeError;
use std::fmt;

/// Which side of a channel a transport handle serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Publisher,
    Subscriber,
}

/// Host and port of a publishing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    host: String,
    port: u16,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Address a publisher binds on every interface.
    #[must_use]
    pub fn any(port: u16) -> Self {
        Self::new("*", port)
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp://{}:{}", self.host, self.port)
    }
}

/// Check a caller-supplied port number.
pub fn validate_port(port: i32) -> Result<u16, BridgeError> {
    u16::try_from(port).map_err(|_| BridgeError::InvalidArgument(format!("port {port}")))
}
