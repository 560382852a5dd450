//! Client configuration options.
//!
//! Provides a type-safe configuration surface for timeouts, reconnection,
//! spam filtering, verbose logging and queue persistence. Every field can
//! also be changed at runtime through the corresponding [`Client`] method.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use ws_lifeline::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .with_auto_reconnect(Duration::from_secs(3), 10)
//!     .with_spam_interval(Duration::from_millis(50));
//! ```
//!
//! [`Client`]: crate::Client

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default deadline for a connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between reconnect attempts (constant, no backoff).
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

/// Default ceiling on consecutive failed reconnect attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

// ============================================================================
// ClientOptions
// ============================================================================

/// Client configuration.
///
/// Controls connect deadlines, the reconnection policy, outgoing rate
/// limiting, verbose logging and offline queue persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Deadline for a connect attempt (explicit and reconnect retries).
    pub connect_timeout: Duration,

    /// Reconnect automatically after an unexpected close or error.
    pub auto_reconnect: bool,

    /// Fixed delay between reconnect attempts.
    pub reconnect_interval: Duration,

    /// Maximum consecutive failed reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,

    /// Minimum interval between outgoing sends. `None` disables filtering.
    pub spam_interval: Option<Duration>,

    /// Emit human-readable lifecycle lines to the log callback.
    pub verbose: bool,

    /// Mirror the offline queue to the configured store.
    pub persist_queue: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auto_reconnect: false,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            spam_interval: None,
            verbose: false,
            persist_queue: false,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the connect deadline.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Arms automatic reconnection with a fixed retry interval and attempt
    /// ceiling.
    #[inline]
    #[must_use]
    pub fn with_auto_reconnect(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.auto_reconnect = true;
        self.reconnect_interval = interval;
        self.max_reconnect_attempts = max_attempts;
        self
    }

    /// Sets the minimum interval between outgoing sends.
    #[inline]
    #[must_use]
    pub fn with_spam_interval(mut self, interval: Duration) -> Self {
        self.spam_interval = Some(interval);
        self
    }

    /// Enables verbose lifecycle logging.
    #[inline]
    #[must_use]
    pub fn with_verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Enables offline queue persistence.
    ///
    /// A [`QueueStore`](crate::QueueStore) must be attached for this to take
    /// effect.
    #[inline]
    #[must_use]
    pub fn with_queue_persistence(mut self) -> Self {
        self.persist_queue = true;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::new();
        assert_eq!(options.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(!options.auto_reconnect);
        assert_eq!(options.reconnect_interval, DEFAULT_RECONNECT_INTERVAL);
        assert_eq!(options.max_reconnect_attempts, DEFAULT_MAX_RECONNECT_ATTEMPTS);
        assert_eq!(options.spam_interval, None);
        assert!(!options.verbose);
        assert!(!options.persist_queue);
    }

    #[test]
    fn test_with_auto_reconnect() {
        let options = ClientOptions::new().with_auto_reconnect(Duration::from_secs(1), 5);
        assert!(options.auto_reconnect);
        assert_eq!(options.reconnect_interval, Duration::from_secs(1));
        assert_eq!(options.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_with_spam_interval() {
        let options = ClientOptions::new().with_spam_interval(Duration::from_millis(50));
        assert_eq!(options.spam_interval, Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_builder_chains() {
        let options = ClientOptions::new()
            .with_connect_timeout(Duration::from_secs(5))
            .with_verbose()
            .with_queue_persistence();
        assert_eq!(options.connect_timeout, Duration::from_secs(5));
        assert!(options.verbose);
        assert!(options.persist_queue);
    }
}
