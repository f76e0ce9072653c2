//! Interconnect Wire Protocol - Envelopes and transfer frames
//!
//! This crate implements the transport-independent transfer structures:
//! - Passport envelopes (opaque payload + identity + signature)
//! - Transfer request, acknowledgement and rejection messages
//! - Binary frame format (fixed header + length-prefixed fields)
//! - JSON client/server messages generic over app intents and snapshots

pub mod envelope;
pub mod flags;
pub mod frame;
pub mod header;
pub mod message;
pub mod transfer;

pub use envelope::*;
pub use flags::*;
pub use frame::*;
pub use header::*;
pub use message::*;
pub use transfer::*;
