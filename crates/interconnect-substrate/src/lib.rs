//! Interconnect Substrate - Static content independent of authority
//!
//! Substrate objects are immutable blobs keyed by the SHA-256 of their bytes.
//! The cache serves reads in every authority state, including ghost mode;
//! writes require a state that permits them.

pub mod cache;
pub mod disk;
pub mod hash;

pub use cache::*;
pub use disk::*;
pub use hash::*;
