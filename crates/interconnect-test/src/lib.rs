//! Interconnect Test Harness - Multi-server handoff validation
//!
//! This crate provides:
//! - A recording host with switchable reachability
//! - An in-process federation of servers joined by memory links
//! - Scenario tests for transfers, admission, replay and ghost mode

pub mod harness;
#[cfg(test)]
mod scenarios;

pub use harness::*;
