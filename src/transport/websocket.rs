//! Production WebSocket transport over `tokio-tungstenite`.
//!
//! Payloads map to text frames. Binary, Ping and Pong frames are ignored;
//! protocol-level ping/pong is the socket library's concern, while the
//! client's keep-alive and latency probes are ordinary payloads.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::{LinkEvent, Transport, TransportLink};

// ============================================================================
// Types
// ============================================================================

/// Write half of a connected WebSocket.
type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a connected WebSocket.
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

// ============================================================================
// WsTransport
// ============================================================================

/// WebSocket [`Transport`] implementation.
///
/// Connects with `tokio_tungstenite::connect_async`; the address must be a
/// `ws://` URL (or `wss://` with a TLS feature enabled on
/// `tokio-tungstenite`).
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl WsTransport {
    /// Creates the transport.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, address: &str) -> Result<Box<dyn TransportLink>> {
        let (stream, _response) = tokio_tungstenite::connect_async(address)
            .await
            .map_err(|e| Error::connect(format!("WebSocket handshake failed: {e}")))?;

        debug!(address, "WebSocket connection established");

        let (sink, stream) = stream.split();
        Ok(Box::new(WsLink { sink, stream }))
    }
}

// ============================================================================
// WsLink
// ============================================================================

/// An open WebSocket connection.
struct WsLink {
    /// Outgoing frame sink.
    sink: WsSink,
    /// Incoming frame stream.
    stream: WsStream,
}

#[async_trait]
impl TransportLink for WsLink {
    async fn send(&mut self, payload: &str) -> Result<()> {
        self.sink.send(Message::text(payload)).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> LinkEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return LinkEvent::Message(text.to_string()),

                Some(Ok(Message::Close(_))) => {
                    debug!("WebSocket closed by remote");
                    return LinkEvent::Closed;
                }

                // Ignore Binary, Ping, Pong, raw frames.
                Some(Ok(other)) => {
                    trace!(kind = ?other, "Ignoring non-text frame");
                }

                Some(Err(e)) => return LinkEvent::Error(e.to_string()),

                None => {
                    debug!("WebSocket stream ended");
                    return LinkEvent::Closed;
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    /// Binds an echo server that accepts one WebSocket connection and echoes
    /// every text frame back.
    async fn spawn_echo_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        tokio::spawn(async move {
            let (stream, _addr) = listener.accept().await.expect("accept");
            let ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            let (mut write, mut read) = ws.split();

            while let Some(Ok(message)) = read.next().await {
                if let Message::Text(text) = message
                    && write.send(Message::text(text.as_str())).await.is_err()
                {
                    break;
                }
            }
        });

        format!("ws://127.0.0.1:{port}")
    }

    #[tokio::test]
    async fn test_open_send_receive_close() {
        let url = spawn_echo_server().await;

        let transport = WsTransport::new();
        let mut link = transport.open(&url).await.expect("open");

        link.send("hello").await.expect("send");
        let event = link.next_event().await;
        assert_eq!(event, LinkEvent::Message("hello".to_string()));

        link.close().await;
    }

    #[tokio::test]
    async fn test_open_refused() {
        // Bind a port, then drop the listener so nothing is listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let transport = WsTransport::new();
        let result = transport.open(&format!("ws://127.0.0.1:{port}")).await;

        assert!(result.is_err());
        assert!(result.err().unwrap().is_connection_error());
    }

    #[tokio::test]
    async fn test_server_close_reports_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        tokio::spawn(async move {
            let (stream, _addr) = listener.accept().await.expect("accept");
            let ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            drop(ws);
        });

        let transport = WsTransport::new();
        let mut link = transport
            .open(&format!("ws://127.0.0.1:{port}"))
            .await
            .expect("open");

        // Dropping the server side ends the stream.
        let event = link.next_event().await;
        assert!(matches!(event, LinkEvent::Closed | LinkEvent::Error(_)));
    }
}
