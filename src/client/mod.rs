//! Client core: lifecycle, queue, probing, reconnection, middleware.
//!
//! The [`Client`] handle forwards operations to a single worker task that
//! owns every piece of mutable state, mirroring the cooperative
//! single-threaded model of the event-driven design: no two callbacks run
//! concurrently and no locking guards the connection state.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Public handle and builder |
//! | `hooks` | Callback and middleware slots |
//! | `options` | Configuration surface |
//! | `probe` | Keep-alive and latency probing |
//! | `queue` | Offline FIFO queue |
//! | `reconnect` | Reconnection policy state machine |
//! | `worker` | Event loop task |

// ============================================================================
// Submodules
// ============================================================================

/// Public handle and builder.
pub mod core;

/// Callback and middleware slots.
pub mod hooks;

/// Configuration surface.
pub mod options;

/// Keep-alive and latency probing.
mod probe;

/// Offline FIFO queue.
mod queue;

/// Reconnection policy state machine.
mod reconnect;

/// Event loop task.
mod worker;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Client, ClientBuilder};
pub use hooks::{
    CloseCallback, ErrorCallback, LatencyCallback, LogCallback, MessageCallback, Middleware,
    OpenCallback, ReconnectCallback, SpamCallback,
};
pub use options::{
    ClientOptions, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_RECONNECT_INTERVAL,
};
