//! Interconnect Authority - Who is authoritative for each content unit
//!
//! This crate owns the handoff:
//! - The per-unit lifecycle state machine with its pending-transfer marker
//! - The authority table (per-unit locking, persistence, change hooks)
//! - The border: verify, interpret, apply import policy, admit
//! - The transfer coordinator: seal, send, commit or roll back
//! - The liveness prober driving Unreachable and Ghost

pub mod border;
pub mod coordinator;
pub mod host;
pub mod ledger;
pub mod lifecycle;
pub mod probe;
pub mod store;
pub mod table;

pub use border::*;
pub use coordinator::*;
pub use host::*;
pub use ledger::*;
pub use lifecycle::*;
pub use probe::*;
pub use store::*;
pub use table::*;
