//! Interconnect Policy - Border admission rules
//!
//! A destination declares what it will import. Rules run against the
//! application's interpretation of a passport, never the signed bytes:
//! - Field paths into the interpreted value
//! - Predicates and the three rule kinds (accept-if, reject-if, strip-field)
//! - The evaluation engine and its decisions
//! - Policy books selected through a server manifest

pub mod book;
pub mod engine;
pub mod path;
pub mod policy;
pub mod rule;

pub use book::*;
pub use engine::*;
pub use path::*;
pub use policy::*;
pub use rule::*;
