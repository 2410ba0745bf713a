//! mbridge core: transport-agnostic protocol primitives, domain records, and errors.
//!
//! This crate defines the wire-level contract spoken with the robot bridge: the
//! envelope codec for its JSON-like text subset, the anchored field extractor
//! behind it, and the mapping between payload fragments and domain records.
//! It carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed bridge replies surface as `BridgeError`/`Result`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod msgs;
pub mod protocol;

/// Shared result type.
pub use error::{BridgeError, Result};
