//! Interconnect Crypto - Identity verification and passport sealing
//!
//! Provides the border's trust primitives:
//! - Ed25519 keypairs whose fingerprint is the identity payload
//! - Verification strategies (cryptographic, delegated, local)
//! - The identity verifier: a scheme registry frozen at startup
//! - Sealing and opening passport envelopes

pub mod keys;
pub mod scheme;
pub mod seal;
pub mod verifier;

pub use keys::*;
pub use scheme::*;
pub use seal::*;
pub use verifier::*;
