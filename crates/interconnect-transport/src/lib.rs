//! Interconnect Transport - Delivering transfer messages
//!
//! Concrete network bindings live outside the core. This crate provides:
//! - The ports: [`TransferLink`] (origin side) and [`TransferHandler`]
//!   (destination side)
//! - In-process links that still pass every message through the wire codec
//! - A directory mapping server references to links

pub mod channel;
pub mod directory;
pub mod link;
pub mod memory;

pub use channel::*;
pub use directory::*;
pub use link::*;
pub use memory::*;
