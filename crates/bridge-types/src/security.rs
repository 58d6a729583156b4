//! # Key Material
//!
//! CURVE key strings handed to the transport for encrypted channels.
//!
//! ## Security Properties
//!
//! - Keys are owned by the endpoint once accepted and never handed back
//! - `Debug` output is redacted so keys do not leak into logs
//! - Format checking is the transport's job; [`CurveKey::is_z85`] is offered
//!   for transports that use the 40-character Z85 encoding

use std::fmt;

/// Length of a Z85-encoded 32-byte CURVE key.
pub const Z85_KEY_LEN: usize = 40;

const Z85_ALPHABET: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<>()[]{}@%$#";

/// A single key string.
#[derive(Clone, PartialEq, Eq)]
pub struct CurveKey(String);

impl CurveKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw key text, for the transport only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True when the key is a 40-character Z85 string.
    #[must_use]
    pub fn is_z85(&self) -> bool {
        self.0.len() == Z85_KEY_LEN && self.0.bytes().all(|b| Z85_ALPHABET.contains(&b))
    }
}

impl fmt::Debug for CurveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CurveKey(<redacted>)")
    }
}

/// Key material accepted by an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Publisher side: the server's secret key.
    ServerSecret(CurveKey),
    /// Subscriber side: the client's own key pair.
    ClientPair { secret: CurveKey, public: CurveKey },
    /// Subscriber side: the server's public key.
    ServerPublic(CurveKey),
}

impl KeyMaterial {
    /// Every key contained in this material.
    #[must_use]
    pub fn keys(&self) -> Vec<&CurveKey> {
        match self {
            Self::ServerSecret(k) | Self::ServerPublic(k) => vec![k],
            Self::ClientPair { secret, public } => vec![secret, public],
        }
    }

    /// Label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ServerSecret(_) => "server_secret",
            Self::ClientPair { .. } => "client_pair",
            Self::ServerPublic(_) => "server_public",
        }
    }
}
