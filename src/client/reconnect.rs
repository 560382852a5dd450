//! Reconnection policy state machine.
//!
//! States: Idle, Connected, Reconnecting, Exhausted. An unexpected close or
//! transport error while armed moves Connected → Reconnecting and schedules
//! a retry after a fixed interval (no backoff growth). A failed retry
//! increments the attempt counter; reaching the ceiling moves to Exhausted
//! and stops. A successful connect resets the counter from any state.
//!
//! The policy only decides; the worker owns the single retry deadline, so
//! cancellation is clearing one field.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use super::options::{DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_INTERVAL};

// ============================================================================
// ReconnectState
// ============================================================================

/// Connection lifecycle state as seen by the reconnection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    /// Not connected, no retry pending.
    Idle,
    /// A connection is open.
    Connected,
    /// Connection lost, a retry is pending.
    Reconnecting,
    /// The attempt ceiling was reached; no further retries.
    Exhausted,
}

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Attempt counter, fixed interval, ceiling and enable flag.
#[derive(Debug)]
pub(crate) struct ReconnectPolicy {
    /// Retries are scheduled only while enabled.
    enabled: bool,
    /// Fixed delay between retries.
    interval: Duration,
    /// Maximum consecutive failed retries.
    max_attempts: u32,
    /// Consecutive failed retries so far.
    attempts: u32,
    /// Current lifecycle state.
    state: ReconnectState,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: DEFAULT_RECONNECT_INTERVAL,
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            attempts: 0,
            state: ReconnectState::Idle,
        }
    }
}

impl ReconnectPolicy {
    /// Creates a disarmed policy.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the policy with a retry interval and attempt ceiling.
    ///
    /// Re-arming resets the attempt counter and clears an Exhausted state.
    pub fn arm(&mut self, interval: Duration, max_attempts: u32, connected: bool) {
        self.enabled = true;
        self.interval = interval;
        self.max_attempts = max_attempts;
        self.attempts = 0;
        if self.state == ReconnectState::Exhausted {
            self.state = if connected {
                ReconnectState::Connected
            } else {
                ReconnectState::Idle
            };
        }
    }

    /// Disarms the policy and forces Idle from any state.
    pub fn disarm(&mut self) {
        self.enabled = false;
        self.attempts = 0;
        self.state = ReconnectState::Idle;
    }

    /// Returns `true` while retries are enabled.
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.enabled
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> ReconnectState {
        self.state
    }

    /// Returns the consecutive failed retry count.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Records a successful connect: counter resets, state becomes
    /// Connected.
    pub fn mark_connected(&mut self) {
        self.attempts = 0;
        self.state = ReconnectState::Connected;
    }

    /// Records an explicit disconnect.
    pub fn mark_idle(&mut self) {
        self.state = ReconnectState::Idle;
    }

    /// Handles an unexpected close or transport error.
    ///
    /// Returns the delay before the first retry when armed, `None` when the
    /// loss should not be retried.
    pub fn on_connection_lost(&mut self) -> Option<Duration> {
        if !self.enabled {
            self.state = ReconnectState::Idle;
            return None;
        }
        self.state = ReconnectState::Reconnecting;
        Some(self.interval)
    }

    /// Handles a failed retry.
    ///
    /// Returns the delay before the next retry, or `None` once the ceiling
    /// is reached (state becomes Exhausted).
    pub fn on_retry_failed(&mut self) -> Option<Duration> {
        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            self.state = ReconnectState::Exhausted;
            None
        } else {
            Some(self.interval)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn test_disarmed_loss_goes_idle() {
        let mut policy = ReconnectPolicy::new();
        policy.mark_connected();

        assert_eq!(policy.on_connection_lost(), None);
        assert_eq!(policy.state(), ReconnectState::Idle);
    }

    #[test]
    fn test_armed_loss_schedules_retry() {
        let mut policy = ReconnectPolicy::new();
        policy.arm(INTERVAL, 3, false);
        policy.mark_connected();

        assert_eq!(policy.on_connection_lost(), Some(INTERVAL));
        assert_eq!(policy.state(), ReconnectState::Reconnecting);
    }

    #[test]
    fn test_exactly_max_failed_retries_then_exhausted() {
        let mut policy = ReconnectPolicy::new();
        policy.arm(INTERVAL, 3, false);
        policy.mark_connected();
        policy.on_connection_lost();

        // Retries 1 and 2 reschedule, retry 3 exhausts.
        assert_eq!(policy.on_retry_failed(), Some(INTERVAL));
        assert_eq!(policy.on_retry_failed(), Some(INTERVAL));
        assert_eq!(policy.on_retry_failed(), None);
        assert_eq!(policy.state(), ReconnectState::Exhausted);
        assert_eq!(policy.attempts(), 3);
    }

    #[test]
    fn test_success_resets_counter() {
        let mut policy = ReconnectPolicy::new();
        policy.arm(INTERVAL, 5, false);
        policy.mark_connected();
        policy.on_connection_lost();
        policy.on_retry_failed();
        policy.on_retry_failed();

        policy.mark_connected();
        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.state(), ReconnectState::Connected);

        // A later loss starts over from zero attempts.
        policy.on_connection_lost();
        assert_eq!(policy.on_retry_failed(), Some(INTERVAL));
    }

    #[test]
    fn test_disarm_forces_idle() {
        let mut policy = ReconnectPolicy::new();
        policy.arm(INTERVAL, 3, false);
        policy.mark_connected();
        policy.on_connection_lost();

        policy.disarm();
        assert_eq!(policy.state(), ReconnectState::Idle);
        assert!(!policy.is_armed());
        assert_eq!(policy.attempts(), 0);
    }

    #[test]
    fn test_rearm_clears_exhausted() {
        let mut policy = ReconnectPolicy::new();
        policy.arm(INTERVAL, 1, false);
        policy.mark_connected();
        policy.on_connection_lost();
        policy.on_retry_failed();
        assert_eq!(policy.state(), ReconnectState::Exhausted);

        policy.arm(INTERVAL, 1, false);
        assert_eq!(policy.state(), ReconnectState::Idle);
        assert_eq!(policy.attempts(), 0);
    }
}
