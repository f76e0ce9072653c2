//! Identifier types for the handoff protocol
//!
//! Unit keys are application-defined and opaque; the core only ever hashes
//! and compares them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Key of a content unit (a player session, a post, a room)
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct UnitKey(Vec<u8>);

impl UnitKey {
    #[inline]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        UnitKey(bytes.into())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for UnitKey {
    fn from(s: &str) -> Self {
        UnitKey(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for UnitKey {
    fn from(bytes: Vec<u8>) -> Self {
        UnitKey(bytes)
    }
}

impl fmt::Debug for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unit({})", self)
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Printable keys are shown as-is, everything else as hex
        match std::str::from_utf8(&self.0) {
            Ok(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_graphic()) => f.write_str(s),
            _ => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

/// Reference to a server (app-defined, typically a URL or peer name)
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerRef(String);

impl ServerRef {
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        ServerRef(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServerRef {
    fn from(s: &str) -> Self {
        ServerRef(s.to_string())
    }
}

impl fmt::Debug for ServerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Server({})", self.0)
    }
}

impl fmt::Display for ServerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transfer correlation id - ties a destination acknowledgement to one attempt
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CorrelationId(pub [u8; 16]);

impl CorrelationId {
    pub const SIZE: usize = 16;

    /// Generate a random correlation id
    pub fn generate() -> Self {
        CorrelationId(rand::random())
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        CorrelationId(bytes)
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 16] {
        self.0
    }
}

impl fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Corr({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for CorrelationId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(CorrelationId(bytes))
    }
}
