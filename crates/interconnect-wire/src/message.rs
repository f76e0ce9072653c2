//! Client-facing protocol messages
//!
//! The message types are generic over Intent and Snapshot. Applications
//! define their own types; this module provides the envelope. Messages are
//! JSON objects tagged by `type`.

use serde::{Deserialize, Serialize};

use interconnect_core::{Identity, Manifest};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage<I> {
    /// Authenticate with the server
    Auth {
        identity: Identity,
        /// Passport bytes if arriving from another server
        #[serde(default)]
        passport: Option<Vec<u8>>,
    },
    /// Application-defined action request
    Intent(I),
    /// Acknowledge receipt of a snapshot
    Ack { seq: u64 },
    /// Request transfer to another server
    RequestTransfer { destination: String },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<S> {
    /// Server manifest (sent on connection)
    Manifest(Manifest),
    /// Snapshot of current state
    Snapshot { seq: u64, data: S },
    /// Directive to reconnect elsewhere
    Transfer(TransferDirective),
    /// Error or rejection
    Error { code: String, message: String },
}

/// Tells a client to reconnect to the new authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDirective {
    /// Where to connect (app-defined, typically a URL)
    pub destination: String,
    /// Passport to present in the next `Auth`
    pub passport: Vec<u8>,
}
