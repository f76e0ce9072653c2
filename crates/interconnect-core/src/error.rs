//! Error types for the handoff protocol

use thiserror::Error;

use crate::{AuthorityState, IdentityParseError, ServerRef, UnitKey};

/// Core Interconnect errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterconnectError {
    // Identity errors
    #[error("Invalid identity: {0}")]
    InvalidIdentity(#[from] IdentityParseError),

    #[error("Unknown identity scheme: {0}")]
    UnknownScheme(String),

    #[error("Missing signature")]
    MissingSignature,

    #[error("Invalid signature")]
    SignatureInvalid,

    #[error("Invalid scheme name: {0}")]
    InvalidSchemeName(String),

    #[error("Scheme already registered: {0}")]
    SchemeAlreadyRegistered(String),

    #[error("Identity verifier already installed")]
    RegistryAlreadyInstalled,

    // Border errors
    #[error("Rejected by import policy: {0}")]
    PolicyRejected(String),

    // Authority errors
    #[error("Transfer already in flight for unit {0}")]
    TransferConflict(UnitKey),

    #[error("Transfer timed out")]
    TimedOut,

    #[error("Transfer cancelled before acknowledgement")]
    Cancelled,

    #[error("Authority required: unit is {0}")]
    AuthorityRequired(AuthorityState),

    #[error("Invalid transition: {event} from {from}")]
    InvalidTransition {
        from: AuthorityState,
        event: &'static str,
    },

    #[error("Unit not found: {0}")]
    UnitNotFound(UnitKey),

    #[error("Only the origin {0} may end this delegation")]
    NotOrigin(ServerRef),

    #[error("Authority unreachable")]
    Unreachable,

    // Wire errors
    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    // Environment errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl InterconnectError {
    /// Whether a fresh attempt may succeed without changing the request.
    ///
    /// Verification and policy failures are terminal for an attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InterconnectError::TimedOut
                | InterconnectError::Unreachable
                | InterconnectError::Transport(_)
        )
    }
}

impl From<std::io::Error> for InterconnectError {
    fn from(e: std::io::Error) -> Self {
        InterconnectError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for InterconnectError {
    fn from(e: serde_json::Error) -> Self {
        InterconnectError::Storage(e.to_string())
    }
}

/// Result type for Interconnect operations
pub type InterconnectResult<T> = Result<T, InterconnectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(InterconnectError::TimedOut.is_retryable());
        assert!(InterconnectError::Transport("reset".into()).is_retryable());
        assert!(!InterconnectError::SignatureInvalid.is_retryable());
        assert!(!InterconnectError::PolicyRejected("too new".into()).is_retryable());
        assert!(!InterconnectError::TransferConflict(UnitKey::from("u")).is_retryable());
    }

    #[test]
    fn test_messages() {
        let err = InterconnectError::AuthorityRequired(AuthorityState::Ghost);
        assert_eq!(err.to_string(), "Authority required: unit is ghost");
        let err: InterconnectError = IdentityParseError::EmptyScheme.into();
        assert!(matches!(err, InterconnectError::InvalidIdentity(_)));
    }
}
