//! Callback and middleware slots.
//!
//! The client exposes one slot per event kind and one middleware slot per
//! direction. Registration replaces the previous occupant (last registration
//! wins); there is no multi-subscriber fan-out. Slots are shared between the
//! [`Client`](crate::Client) handle and the worker task, so registering a
//! callback never round-trips through the command channel.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::Error;

// ============================================================================
// Callback Types
// ============================================================================

/// Invoked when the transport reports open.
pub type OpenCallback = Box<dyn Fn() + Send + Sync>;

/// Invoked when the connection closes (expected or not).
pub type CloseCallback = Box<dyn Fn() + Send + Sync>;

/// Invoked for every incoming payload that is not consumed by the latency
/// prober.
pub type MessageCallback = Box<dyn Fn(String) + Send + Sync>;

/// Invoked when the transport or the persistence store reports an error.
pub type ErrorCallback = Box<dyn Fn(&Error) + Send + Sync>;

/// Invoked with the payload dropped by the spam filter.
pub type SpamCallback = Box<dyn Fn(String) + Send + Sync>;

/// Invoked with verbose lifecycle lines when verbose logging is enabled.
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Invoked with each new round-trip latency sample.
pub type LatencyCallback = Box<dyn Fn(Duration) + Send + Sync>;

/// Invoked after a successful reconnect with the number of attempts used.
pub type ReconnectCallback = Box<dyn Fn(u32) + Send + Sync>;

/// Transform applied to every payload crossing the send or receive boundary.
pub type Middleware = Box<dyn Fn(String) -> String + Send + Sync>;

// ============================================================================
// Hooks
// ============================================================================

/// All registered callbacks and middleware, one slot each.
#[derive(Default)]
pub(crate) struct Hooks {
    pub open: Option<OpenCallback>,
    pub close: Option<CloseCallback>,
    pub message: Option<MessageCallback>,
    pub error: Option<ErrorCallback>,
    pub spam: Option<SpamCallback>,
    pub log: Option<LogCallback>,
    pub latency: Option<LatencyCallback>,
    pub reconnect: Option<ReconnectCallback>,
    pub outgoing: Option<Middleware>,
    pub incoming: Option<Middleware>,
}

/// Hook slots shared between the client handle and the worker.
pub(crate) type SharedHooks = Arc<Mutex<Hooks>>;

/// Creates an empty shared slot set.
pub(crate) fn shared() -> SharedHooks {
    Arc::new(Mutex::new(Hooks::default()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_last_registration_wins() {
        let hooks = shared();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        {
            let counter = Arc::clone(&first);
            hooks.lock().open = Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        {
            let counter = Arc::clone(&second);
            hooks.lock().open = Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        if let Some(cb) = &hooks.lock().open {
            cb();
        }

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_middleware_slot_replaces() {
        let hooks = shared();
        hooks.lock().outgoing = Some(Box::new(|p| format!("a:{p}")));
        hooks.lock().outgoing = Some(Box::new(|p| format!("b:{p}")));

        let guard = hooks.lock();
        let transform = guard.outgoing.as_ref().expect("middleware set");
        assert_eq!(transform("x".to_string()), "b:x");
    }
}
