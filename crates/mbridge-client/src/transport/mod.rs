//! Transport layer (message-oriented, one connection per operation).
//!
//! The session only needs four things from a transport: open a connection,
//! send one text frame, wait for the next inbound event, and close. The
//! WebSocket implementation lives in [`ws`]; tests plug in scripted fakes.

pub mod ws;

use async_trait::async_trait;
use mbridge_core::error::{BridgeError, Result};

pub use ws::WsTransport;

/// Parsed `scheme://host:port` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Validate an address before any connection is attempted.
    pub fn parse(uri: &str) -> Result<Self> {
        let bad = |why: &str| BridgeError::BadAddress(format!("{uri:?}: {why}"));

        let (scheme, rest) = uri.split_once("://").ok_or_else(|| bad("missing scheme"))?;
        if scheme != "ws" {
            return Err(bad("only ws:// is supported"));
        }

        let rest = rest.strip_suffix('/').unwrap_or(rest);
        let (host, port) = rest.rsplit_once(':').ok_or_else(|| bad("missing port"))?;
        if host.is_empty() || host.contains(['/', ' ', '?', '#']) {
            return Err(bad("invalid host"));
        }
        let port: u16 = port.parse().map_err(|_| bad("invalid port"))?;
        if port == 0 {
            return Err(bad("port must be non-zero"));
        }

        Ok(Self {
            scheme: scheme.to_owned(),
            host: host.to_owned(),
            port,
        })
    }

    pub fn uri(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Inbound event on an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One complete text message.
    Message(String),
    /// The connection ended (close handshake done or stream exhausted).
    Closed,
    /// The connection broke.
    Failed(String),
}

/// One open connection, exclusively owned by a session.
#[async_trait]
pub trait Connection: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Wait for the next event. Must eventually yield `Closed` or `Failed`
    /// once the peer goes away.
    async fn recv(&mut self) -> TransportEvent;

    /// Start the close handshake.
    async fn close(&mut self) -> Result<()>;
}

/// Connection factory.
#[async_trait]
pub trait Transport: Send + Sync {
    type Conn: Connection;

    /// Open one connection. An `Err` here is a transport failure (refused,
    /// unreachable, handshake rejected).
    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Conn>;
}
