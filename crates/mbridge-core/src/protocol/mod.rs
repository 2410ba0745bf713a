//! Protocol modules (envelope codec, field extraction, payload mapping).
//!
//! The bridge speaks a small JSON-like text subset. Instead of a general JSON
//! parser, values are located through anchored `"<key>":` matches:
//! - `envelope`: the tagged message exchanged per connection.
//! - `field`: the shared extraction primitive (quoted / object / bare tiers).
//! - `payload`: domain record <-> payload fragment mapping.
//!
//! Everything here is panic-free: malformed input comes back as `BridgeError`
//! or as an empty field, never as an out-of-bounds index.

pub mod envelope;
pub mod field;
pub mod payload;

pub use envelope::{Envelope, MessageType};
pub use payload::PayloadRecord;
