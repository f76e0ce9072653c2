//! Scheme-qualified identities
//!
//! Identity format: `scheme:payload`
//!
//! - `local:name` - trust the connection (dev/LAN, single process)
//! - `url:user@server` - the named server vouches for the user
//! - `ed25519:fingerprint` - cryptographic, the holder owns the key
//!
//! Identities are immutable once issued. Uniqueness is per scheme only:
//! `local:alice` and `url:alice` are different principals.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Scheme name for trust-the-connection identities
pub const LOCAL_SCHEME: &str = "local";
/// Scheme name for server-vouched identities
pub const URL_SCHEME: &str = "url";
/// Scheme name for Ed25519 key-holder identities
pub const ED25519_SCHEME: &str = "ed25519";

/// An identity in the form `scheme:payload`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity {
    scheme: String,
    payload: String,
}

impl Identity {
    /// Create a new identity, validating both halves.
    pub fn new(
        scheme: impl Into<String>,
        payload: impl Into<String>,
    ) -> Result<Self, IdentityParseError> {
        let scheme = scheme.into();
        let payload = payload.into();
        validate_scheme(&scheme)?;
        validate_payload(&payload)?;
        Ok(Identity { scheme, payload })
    }

    /// Create a local (trust-the-connection) identity.
    ///
    /// The builtin constructors skip validation; use [`Identity::new`] for
    /// untrusted input.
    pub fn local(name: impl Into<String>) -> Self {
        Self::builtin(LOCAL_SCHEME, name.into())
    }

    /// Create a URL-based (server-vouched) identity.
    pub fn url(user_at_server: impl Into<String>) -> Self {
        Self::builtin(URL_SCHEME, user_at_server.into())
    }

    /// Create an Ed25519 identity from a key fingerprint.
    pub fn ed25519(fingerprint: impl Into<String>) -> Self {
        Self::builtin(ED25519_SCHEME, fingerprint.into())
    }

    fn builtin(scheme: &str, payload: String) -> Self {
        debug_assert!(validate_payload(&payload).is_ok());
        Identity {
            scheme: scheme.to_string(),
            payload,
        }
    }

    /// The scheme (e.g. "local", "url", "ed25519").
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The payload; its interpretation depends on the scheme.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Check if this is a local (unverified) identity.
    pub fn is_local(&self) -> bool {
        self.scheme == LOCAL_SCHEME
    }
}

/// Scheme names are lowercase ASCII: a letter followed by letters, digits, `-` or `_`.
pub fn validate_scheme(scheme: &str) -> Result<(), IdentityParseError> {
    let mut chars = scheme.chars();
    match chars.next() {
        None => return Err(IdentityParseError::EmptyScheme),
        Some(c) if !c.is_ascii_lowercase() => {
            return Err(IdentityParseError::InvalidScheme(scheme.to_string()))
        }
        Some(_) => {}
    }
    if chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
        Ok(())
    } else {
        Err(IdentityParseError::InvalidScheme(scheme.to_string()))
    }
}

fn validate_payload(payload: &str) -> Result<(), IdentityParseError> {
    if payload.is_empty() {
        return Err(IdentityParseError::EmptyPayload);
    }
    if !payload.is_ascii() || payload.chars().any(|c| c.is_ascii_control()) {
        return Err(IdentityParseError::NonAscii);
    }
    Ok(())
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.payload)
    }
}

impl FromStr for Identity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, payload) = s
            .split_once(':')
            .ok_or_else(|| IdentityParseError::MissingColon(s.to_string()))?;
        Identity::new(scheme, payload)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.to_string()
    }
}

/// Error parsing an identity string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityParseError {
    #[error("identity must contain ':' separator, got: {0}")]
    MissingColon(String),
    #[error("identity scheme cannot be empty")]
    EmptyScheme,
    #[error("identity scheme must be lowercase ascii, got: {0}")]
    InvalidScheme(String),
    #[error("identity payload cannot be empty")]
    EmptyPayload,
    #[error("identity must be printable ascii")]
    NonAscii,
}
