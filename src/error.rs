//! Error types for the resilient WebSocket client.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ws_lifeline::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     client.connect().await?;
//!     client.send("hello")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::InvalidAddress`] |
//! | Connection | [`Error::Connect`], [`Error::ConnectTimeout`], [`Error::NotConnected`] |
//! | Transport | [`Error::Transport`], [`Error::WebSocket`] |
//! | Lifecycle | [`Error::Destroyed`] |
//! | Persistence | [`Error::Store`], [`Error::Json`], [`Error::Io`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Target address failed validation.
    ///
    /// Returned at construction time when the address cannot be parsed.
    #[error("Invalid address {address}: {message}")]
    InvalidAddress {
        /// The rejected address.
        address: String,
        /// Description of what is wrong with it.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The transport failed before reporting open.
    ///
    /// Rejects the pending connect result.
    #[error("Connect failed: {message}")]
    Connect {
        /// Description of the connection failure.
        message: String,
    },

    /// The connect deadline elapsed before the transport opened.
    #[error("Connect timeout after {timeout_ms}ms")]
    ConnectTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// An operation required an open connection but none is held.
    #[error("Not connected")]
    NotConnected,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The transport reported an error on an established connection.
    ///
    /// Surfaced via the error callback; triggers the reconnection policy
    /// when armed.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The client was destroyed.
    ///
    /// Returned by every operation issued after [`destroy`](crate::Client::destroy).
    #[error("Client destroyed")]
    Destroyed,

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// The persistent queue store reported a failure.
    #[error("Store error: {message}")]
    Store {
        /// Description of the store failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// Queue serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// WebSocket error from the production transport.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid address error.
    #[inline]
    pub fn invalid_address(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Creates a connect error.
    #[inline]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Creates a connect timeout error.
    #[inline]
    pub fn connect_timeout(timeout_ms: u64) -> Self {
        Self::ConnectTimeout { timeout_ms }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a store error.
    #[inline]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::ConnectTimeout { .. }
                | Self::NotConnected
                | Self::Transport { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::ConnectTimeout { .. }
                | Self::NotConnected
                | Self::Transport { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connect("refused");
        assert_eq!(err.to_string(), "Connect failed: refused");
    }

    #[test]
    fn test_invalid_address_display() {
        let err = Error::invalid_address("nonsense", "relative URL without a base");
        assert_eq!(
            err.to_string(),
            "Invalid address nonsense: relative URL without a base"
        );
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::connect_timeout(5000);
        let other_err = Error::connect("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        let conn_err = Error::connect("test");
        let timeout_err = Error::connect_timeout(1000);
        let transport_err = Error::transport("reset by peer");
        let other_err = Error::store("test");

        assert!(conn_err.is_connection_error());
        assert!(timeout_err.is_connection_error());
        assert!(transport_err.is_connection_error());
        assert!(Error::NotConnected.is_connection_error());
        assert!(!other_err.is_connection_error());
        assert!(!Error::Destroyed.is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::connect_timeout(1000).is_recoverable());
        assert!(Error::transport("test").is_recoverable());
        assert!(!Error::Destroyed.is_recoverable());
        assert!(!Error::store("test").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
