//! WebSocket transport (tokio-tungstenite client).
//!
//! Text frames are surfaced as messages. Ping/pong and binary frames are
//! skipped; a close frame or the end of the stream ends the connection.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use mbridge_core::error::{BridgeError, Result};

use super::{Connection, Endpoint, Transport, TransportEvent};

/// Plain `ws://` transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    type Conn = WsConnection;

    async fn connect(&self, endpoint: &Endpoint) -> Result<WsConnection> {
        let uri = endpoint.uri();
        let (stream, _resp) = tokio_tungstenite::connect_async(uri.as_str())
            .await
            .map_err(|e| BridgeError::Transport(format!("connect {uri} failed: {e}")))?;
        debug!(%uri, "websocket open");
        Ok(WsConnection { stream })
    }
}

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| BridgeError::Transport(format!("send failed: {e}")))
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(s))) => return TransportEvent::Message(s),
                Some(Ok(Message::Close(_))) | None => return TransportEvent::Closed,
                Some(Ok(other)) => {
                    debug!(len = other.len(), "skipping non-text frame");
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    return TransportEvent::Closed;
                }
                Some(Err(e)) => return TransportEvent::Failed(e.to_string()),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(BridgeError::Transport(format!("close failed: {e}"))),
        }
    }
}
