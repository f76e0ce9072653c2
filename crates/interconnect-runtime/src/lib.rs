//! Interconnect Runtime - A federated server assembled from the core crates
//!
//! [`Server`] wires the identity verifier, import policy, substrate cache,
//! authority table, border, transfer coordinator and liveness prober
//! together from a [`ServerConfig`].

pub mod config;
pub mod server;
pub mod telemetry;

pub use config::*;
pub use server::*;
pub use telemetry::*;
