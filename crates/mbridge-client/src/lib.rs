//! mbridge client library entry.
//!
//! This crate wires the config layer, the transport abstraction, and the
//! per-operation session state machine into the robot-facing API. Every
//! operation opens exactly one short-lived connection to the bridge.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod client;
pub mod config;
pub mod robot;
pub mod session;
pub mod transport;

pub use client::{BridgeClient, ReadOutcome};
pub use robot::Robot;
