//! Top-level facade crate for mbridge.
//!
//! Re-exports the protocol core and the client library so users can depend on a single crate.

pub mod core {
    pub use mbridge_core::*;
}

pub mod client {
    pub use mbridge_client::*;
}
