//! Transport abstraction consumed by the client core.
//!
//! The core never touches a socket directly: it opens a [`TransportLink`]
//! through a [`Transport`], sends payloads through the link, and reacts to
//! the [`LinkEvent`]s the link reports. Everything below that seam (framing,
//! TLS, the OS network stack) belongs to the transport implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                       ┌──────────────────┐
//! │  Client worker   │   open / send / close │  Transport impl  │
//! │                  │──────────────────────►│  (WebSocket, …)  │
//! │   select loop    │◄──────────────────────│                  │
//! └──────────────────┘   Message/Error/Closed└──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | Production transport over `tokio-tungstenite` |

// ============================================================================
// Submodules
// ============================================================================

/// Production WebSocket transport.
pub mod websocket;

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::WsTransport;

// ============================================================================
// LinkEvent
// ============================================================================

/// Asynchronous notification reported by an open link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A payload arrived from the peer.
    Message(String),
    /// The transport failed. The link is unusable afterwards.
    Error(String),
    /// The connection closed. Terminal for the link.
    Closed,
}

// ============================================================================
// Transport
// ============================================================================

/// Factory for opening connections to a target address.
///
/// Implementations are shared between reconnect attempts, so opening must
/// not consume the transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a connection to `address`.
    ///
    /// Resolves once the transport reports open. The caller races this
    /// future against its connect deadline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`](crate::Error::Connect) (or a
    /// transport-specific variant) if the connection cannot be established.
    async fn open(&self, address: &str) -> Result<Box<dyn TransportLink>>;
}

// ============================================================================
// TransportLink
// ============================================================================

/// An open connection produced by [`Transport::open`].
///
/// Owned exclusively by the client worker and replaced on each reconnect.
#[async_trait]
pub trait TransportLink: Send {
    /// Transmits a payload to the peer.
    ///
    /// # Errors
    ///
    /// Returns a transport-specific error if the write fails.
    async fn send(&mut self, payload: &str) -> Result<()>;

    /// Waits for the next notification from the peer.
    ///
    /// After [`LinkEvent::Closed`] or [`LinkEvent::Error`] the link must not
    /// be polled again.
    async fn next_event(&mut self) -> LinkEvent;

    /// Closes the connection. Best-effort; errors are swallowed.
    async fn close(&mut self);
}
