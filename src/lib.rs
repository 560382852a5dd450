//! Resilient asynchronous message-socket client.
//!
//! This library wraps a full-duplex transport (WebSocket by default) with
//! the reliability layer applications end up hand-rolling around raw
//! sockets: connection lifecycle management, offline message queuing,
//! liveness probing, latency measurement, automatic reconnection and
//! pluggable payload transformation.
//!
//! # Architecture
//!
//! A cloneable [`Client`] handle fronts a single worker task that owns all
//! connection state:
//!
//! - **Connection manager** — connect with a deadline, disconnect, destroy;
//!   connection state is always derived from the transport's own status
//! - **Outbound queue** — sends issued while disconnected are queued and
//!   flushed FIFO on the next successful connect, optionally mirrored to a
//!   persistent store across restarts
//! - **Prober** — independent keep-alive and latency timers; latency pongs
//!   are consumed by the prober and never reach the message callback
//! - **Middleware** — one transform per direction applied to every payload
//!   crossing the send/receive boundary
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use ws_lifeline::{Client, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new("ws://127.0.0.1:9000")?;
//!
//!     client.on_message(|payload| println!("received: {payload}"));
//!     client.on_close(|| println!("connection closed"));
//!
//!     client.auto_reconnect(Duration::from_secs(3), 10)?;
//!     client.connect().await?;
//!
//!     client.send("hello")?;
//!     client.start_keep_alive(Duration::from_secs(30))?;
//!
//!     client.destroy();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client handle, builder, options, callbacks |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`store`] | Offline queue persistence collaborator |
//! | [`transport`] | Transport seam and WebSocket implementation |
//!
//! # Guarantees
//!
//! - Queued payloads flush in the order they were issued, before the
//!   connect result resolves
//! - `is_connected` never drifts from the transport's reported status
//! - Destroying the client cancels every timer; nothing fires afterwards

// ============================================================================
// Modules
// ============================================================================

/// Client handle, builder, options, callbacks.
///
/// Use [`Client::new`] or [`Client::builder()`] to create a client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Offline queue persistence collaborator.
///
/// Attach a [`QueueStore`] to mirror queued payloads across restarts.
pub mod store;

/// Transport seam and the production WebSocket implementation.
///
/// Implement [`Transport`] to run the client over a different socket
/// primitive (or a mock in tests).
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ClientOptions};

// Error types
pub use error::{Error, Result};

// Store types
pub use store::{FileStore, MemoryStore, QueueStore};

// Transport types
pub use transport::{LinkEvent, Transport, TransportLink, WsTransport};
