//! Interconnect Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout the handoff protocol:
//! - Identities (`scheme:payload`)
//! - Identifiers (UnitKey, ServerRef, CorrelationId)
//! - Authority states for content units
//! - Server manifests and connection states
//! - The error taxonomy

pub mod authority;
pub mod error;
pub mod id;
pub mod identity;
pub mod manifest;

pub use authority::*;
pub use error::*;
pub use id::*;
pub use identity::*;
pub use manifest::*;
