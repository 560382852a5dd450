//! Liveness and latency probing.
//!
//! Two independent repeating timers: a fire-and-forget keep-alive ping and a
//! latency probe whose matched response yields a round-trip sample. Each is
//! restartable and stoppable without affecting the other. The two probes
//! have independent payload configuration; only the latency prober
//! intercepts responses.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

// ============================================================================
// Constants
// ============================================================================

/// Default keep-alive ping payload.
pub(crate) const DEFAULT_KEEP_ALIVE_PING: &str = "ping";

/// Default latency probe payload.
pub(crate) const DEFAULT_LATENCY_PING: &str = "ping";

/// Default latency probe response payload.
pub(crate) const DEFAULT_LATENCY_PONG: &str = "pong";

// ============================================================================
// Timer Construction
// ============================================================================

/// Creates a repeating timer whose first tick fires after one full period.
fn repeating(period: Duration) -> Interval {
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// Waits for the next tick of an optional timer; pends forever when unset.
async fn tick_opt(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

// ============================================================================
// KeepAlive
// ============================================================================

/// Periodic liveness probe with no response correlation.
pub(crate) struct KeepAlive {
    /// Repeating timer; `None` while stopped.
    timer: Option<Interval>,
    /// Payload sent on each tick.
    ping: String,
}

impl KeepAlive {
    /// Creates a stopped keep-alive.
    pub fn new() -> Self {
        Self {
            timer: None,
            ping: DEFAULT_KEEP_ALIVE_PING.to_string(),
        }
    }

    /// Arms the timer. Starting while running replaces the previous timer,
    /// so two keep-alive timers never overlap.
    pub fn start(&mut self, interval: Duration, ping: Option<String>) {
        self.ping = ping.unwrap_or_else(|| DEFAULT_KEEP_ALIVE_PING.to_string());
        self.timer = Some(repeating(interval));
    }

    /// Cancels the timer. Safe to call when not running.
    pub fn stop(&mut self) {
        self.timer = None;
    }

    /// Returns `true` while the timer is armed.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Returns the configured ping payload.
    #[inline]
    pub fn ping(&self) -> &str {
        &self.ping
    }

    /// Waits for the next tick; pends forever while stopped.
    pub async fn tick(&mut self) {
        tick_opt(&mut self.timer).await;
    }
}

// ============================================================================
// LatencyTracker
// ============================================================================

/// Periodic probe whose matched response yields a round-trip sample.
///
/// Only the single most recent sample is retained; there is no aggregation.
pub(crate) struct LatencyTracker {
    /// Repeating timer; `None` while tracking is off.
    timer: Option<Interval>,
    /// Probe payload sent on each tick.
    ping: String,
    /// Response payload recognized and consumed by the prober.
    pong: String,
    /// Send instant of the most recent probe.
    last_probe: Option<Instant>,
    /// Most recent round-trip sample.
    last_sample: Option<Duration>,
}

impl LatencyTracker {
    /// Creates an inactive tracker.
    pub fn new() -> Self {
        Self {
            timer: None,
            ping: DEFAULT_LATENCY_PING.to_string(),
            pong: DEFAULT_LATENCY_PONG.to_string(),
            last_probe: None,
            last_sample: None,
        }
    }

    /// Arms the probe timer. Starting while active replaces the previous
    /// timer and payload configuration.
    pub fn start(&mut self, interval: Duration, ping: Option<String>, pong: Option<String>) {
        self.ping = ping.unwrap_or_else(|| DEFAULT_LATENCY_PING.to_string());
        self.pong = pong.unwrap_or_else(|| DEFAULT_LATENCY_PONG.to_string());
        self.last_probe = None;
        self.timer = Some(repeating(interval));
    }

    /// Disables tracking and stops the timer.
    ///
    /// The most recent sample stays readable after stopping.
    pub fn stop(&mut self) {
        self.timer = None;
        self.last_probe = None;
    }

    /// Returns `true` while tracking is active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    /// Returns the configured probe payload.
    #[inline]
    pub fn ping(&self) -> &str {
        &self.ping
    }

    /// Records the send instant of a transmitted probe.
    #[inline]
    pub fn record_probe(&mut self, at: Instant) {
        self.last_probe = Some(at);
    }

    /// Returns `true` if `payload` is the configured response while tracking
    /// is active. Matching payloads are consumed by the prober and must not
    /// reach the message callback.
    #[inline]
    pub fn matches_pong(&self, payload: &str) -> bool {
        self.is_active() && payload == self.pong
    }

    /// Computes and stores a sample from the most recent probe instant.
    ///
    /// Returns `None` if no probe has been sent yet.
    pub fn sample_round_trip(&mut self) -> Option<Duration> {
        let sample = self.last_probe.map(|at| at.elapsed());
        if let Some(sample) = sample {
            self.last_sample = Some(sample);
        }
        sample
    }

    /// Returns the most recent round-trip sample.
    #[inline]
    pub fn latency(&self) -> Option<Duration> {
        self.last_sample
    }

    /// Waits for the next probe tick; pends forever while inactive.
    pub async fn tick(&mut self) {
        tick_opt(&mut self.timer).await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_start_stop() {
        let mut keep_alive = KeepAlive::new();
        assert!(!keep_alive.is_running());
        assert_eq!(keep_alive.ping(), DEFAULT_KEEP_ALIVE_PING);

        keep_alive.start(Duration::from_secs(1), Some("beat".to_string()));
        assert!(keep_alive.is_running());
        assert_eq!(keep_alive.ping(), "beat");

        keep_alive.stop();
        assert!(!keep_alive.is_running());
        // Stopping twice is fine.
        keep_alive.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_first_tick_after_full_period() {
        let mut keep_alive = KeepAlive::new();
        keep_alive.start(Duration::from_secs(1), None);

        let before = Instant::now();
        keep_alive.tick().await;
        assert_eq!(before.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_pong_matching() {
        let mut tracker = LatencyTracker::new();
        // Inactive: nothing matches.
        assert!(!tracker.matches_pong("pong"));

        tracker.start(Duration::from_secs(1), None, Some("echo".to_string()));
        assert!(tracker.matches_pong("echo"));
        assert!(!tracker.matches_pong("pong"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_sample_computation() {
        let mut tracker = LatencyTracker::new();
        tracker.start(Duration::from_secs(1), None, None);

        // No probe sent yet: a matching pong produces no sample.
        assert_eq!(tracker.sample_round_trip(), None);
        assert_eq!(tracker.latency(), None);

        tracker.record_probe(Instant::now());
        tokio::time::advance(Duration::from_millis(25)).await;

        assert_eq!(tracker.sample_round_trip(), Some(Duration::from_millis(25)));
        assert_eq!(tracker.latency(), Some(Duration::from_millis(25)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_stop_keeps_last_sample() {
        let mut tracker = LatencyTracker::new();
        tracker.start(Duration::from_secs(1), None, None);
        tracker.record_probe(Instant::now());
        tokio::time::advance(Duration::from_millis(10)).await;
        tracker.sample_round_trip();

        tracker.stop();
        assert!(!tracker.is_active());
        assert!(!tracker.matches_pong("pong"));
        assert_eq!(tracker.latency(), Some(Duration::from_millis(10)));
    }
}
