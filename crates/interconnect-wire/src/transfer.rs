//! Transfer request and reply messages
//!
//! Transport bindings deliver a [`TransferMessage`] to the destination and
//! carry a [`TransferReply`] back. Nothing else crosses the wire during a
//! handoff.

use interconnect_core::{CorrelationId, InterconnectError, ServerRef, UnitKey};

use crate::PassportEnvelope;

/// Origin -> destination: request to take over authority for a unit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferMessage {
    /// Correlates the acknowledgement and makes retries idempotent
    pub correlation: CorrelationId,
    /// The content unit being handed off
    pub unit: UnitKey,
    /// The server relinquishing authority
    pub origin: ServerRef,
    /// Passport and identity
    pub envelope: PassportEnvelope,
}

/// Destination -> origin: authority accepted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferAck {
    pub correlation: CorrelationId,
    pub unit: UnitKey,
    /// The new authority
    pub acknowledged_by: ServerRef,
    /// Passport fields removed by the destination's import policy
    pub stripped: Vec<String>,
}

/// Why a destination refused a transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RejectCode {
    UnknownScheme = 0x01,
    MissingSignature = 0x02,
    SignatureInvalid = 0x03,
    PolicyRejected = 0x04,
    Conflict = 0x05,
    Malformed = 0x06,
    Other = 0xFF,
}

impl RejectCode {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(RejectCode::UnknownScheme),
            0x02 => Some(RejectCode::MissingSignature),
            0x03 => Some(RejectCode::SignatureInvalid),
            0x04 => Some(RejectCode::PolicyRejected),
            0x05 => Some(RejectCode::Conflict),
            0x06 => Some(RejectCode::Malformed),
            0xFF => Some(RejectCode::Other),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Destination -> origin: authority refused
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRejection {
    pub correlation: CorrelationId,
    pub unit: UnitKey,
    pub code: RejectCode,
    pub reason: String,
}

impl TransferRejection {
    /// Build a rejection from the error that stopped admission
    pub fn from_error(correlation: CorrelationId, unit: UnitKey, error: &InterconnectError) -> Self {
        let (code, reason) = match error {
            InterconnectError::UnknownScheme(scheme) => (RejectCode::UnknownScheme, scheme.clone()),
            InterconnectError::MissingSignature => (RejectCode::MissingSignature, String::new()),
            InterconnectError::SignatureInvalid => (RejectCode::SignatureInvalid, String::new()),
            InterconnectError::PolicyRejected(reason) => (RejectCode::PolicyRejected, reason.clone()),
            InterconnectError::TransferConflict(_) | InterconnectError::InvalidTransition { .. } => {
                (RejectCode::Conflict, error.to_string())
            }
            InterconnectError::InvalidIdentity(_)
            | InterconnectError::InvalidWireFormat(_)
            | InterconnectError::BufferTooShort { .. } => (RejectCode::Malformed, error.to_string()),
            other => (RejectCode::Other, other.to_string()),
        };
        TransferRejection {
            correlation,
            unit,
            code,
            reason,
        }
    }

    /// Map back to the error the origin reports to its caller
    pub fn to_error(&self) -> InterconnectError {
        match self.code {
            RejectCode::UnknownScheme => InterconnectError::UnknownScheme(self.reason.clone()),
            RejectCode::MissingSignature => InterconnectError::MissingSignature,
            RejectCode::SignatureInvalid => InterconnectError::SignatureInvalid,
            RejectCode::PolicyRejected => InterconnectError::PolicyRejected(self.reason.clone()),
            RejectCode::Conflict => InterconnectError::TransferConflict(self.unit.clone()),
            RejectCode::Malformed => InterconnectError::InvalidWireFormat(self.reason.clone()),
            RejectCode::Other => InterconnectError::Transport(self.reason.clone()),
        }
    }
}

/// Destination's answer to a [`TransferMessage`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferReply {
    Accepted(TransferAck),
    Rejected(TransferRejection),
}

impl TransferReply {
    pub fn correlation(&self) -> CorrelationId {
        match self {
            TransferReply::Accepted(ack) => ack.correlation,
            TransferReply::Rejected(rej) => rej.correlation,
        }
    }

    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, TransferReply::Accepted(_))
    }
}
