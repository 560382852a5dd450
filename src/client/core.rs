//! Client handle and builder.
//!
//! [`Client`] is a cheap, cloneable handle over the worker task that owns
//! all connection state. Operations are commands on an unbounded channel;
//! queries reply over oneshot channels. Dropping every handle stops the
//! worker.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use url::Url;

use crate::error::{Error, Result};
use crate::store::QueueStore;
use crate::transport::{Transport, WsTransport};

use super::hooks::{self, SharedHooks};
use super::options::ClientOptions;
use super::worker::{self, Command};

// ============================================================================
// Client
// ============================================================================

/// Resilient message-socket client.
///
/// Wraps a full-duplex transport with connection lifecycle management,
/// offline queuing, keep-alive and latency probing, reconnection and
/// middleware. Cloning shares the same connection.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use ws_lifeline::{Client, Result};
///
/// # async fn example() -> Result<()> {
/// let client = Client::new("ws://127.0.0.1:9000")?;
/// client.on_message(|payload| println!("received: {payload}"));
///
/// client.connect().await?;
/// client.send("hello")?;
/// client.start_keep_alive(Duration::from_secs(30))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    /// Target address.
    address: Arc<str>,
    /// Command channel to the worker.
    command_tx: mpsc::UnboundedSender<Command>,
    /// Callback and middleware slots, shared with the worker.
    hooks: SharedHooks,
}

// ============================================================================
// Client - Display
// ============================================================================

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Construction
// ============================================================================

impl Client {
    /// Creates a client targeting `address` with the default WebSocket
    /// transport and default options.
    ///
    /// Spawns the worker task, so this must be called within a Tokio
    /// runtime. The connection is not opened until [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address does not parse as a
    /// URL.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Self::builder().address(address).build()
    }

    /// Creates a configuration builder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use ws_lifeline::{Client, ClientOptions, MemoryStore, Result};
    ///
    /// # fn example() -> Result<()> {
    /// let client = Client::builder()
    ///     .address("ws://127.0.0.1:9000")
    ///     .store(Arc::new(MemoryStore::new()))
    ///     .options(ClientOptions::new().with_queue_persistence())
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the target address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

// ============================================================================
// Client - Connection Lifecycle
// ============================================================================

impl Client {
    /// Connects with the configured default timeout.
    ///
    /// Resolves after the transport reports open and the offline queue has
    /// been flushed; no send issued after this resolves can overtake a
    /// queued payload.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectTimeout`] if the deadline elapses first
    /// - [`Error::Connect`] if the transport fails before opening
    /// - [`Error::Destroyed`] if the client was destroyed
    pub async fn connect(&self) -> Result<()> {
        self.request_connect(None).await
    }

    /// Connects with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect).
    pub async fn connect_with_timeout(&self, timeout: Duration) -> Result<()> {
        self.request_connect(Some(timeout)).await
    }

    /// Closes the connection if one is open. Never triggers reconnection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn disconnect(&self) -> Result<()> {
        self.command(Command::Disconnect)
    }

    /// Destroys the client: disables reconnection, disconnects, stops every
    /// timer and releases the transport.
    ///
    /// Safe to call multiple times and from any state. All other operations
    /// fail with [`Error::Destroyed`] afterwards.
    pub fn destroy(&self) {
        let _ = self.command_tx.send(Command::Destroy);
    }

    /// Returns `true` iff a transport link exists and its reported status is
    /// open.
    ///
    /// This queries the worker's live state; no shadow flag is kept, so the
    /// answer cannot drift from the transport's own status. Returns `false`
    /// after destroy.
    pub async fn is_connected(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        if self.command_tx.send(Command::IsConnected { reply: tx }).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    async fn request_connect(&self, timeout: Option<Duration>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(Command::Connect { timeout, reply: tx })
            .map_err(|_| Error::Destroyed)?;
        rx.await.map_err(|_| Error::Destroyed)?
    }

    fn command(&self, command: Command) -> Result<()> {
        self.command_tx.send(command).map_err(|_| Error::Destroyed)
    }
}

// ============================================================================
// Client - Sending
// ============================================================================

impl Client {
    /// Sends a payload.
    ///
    /// Connected: the payload passes outgoing middleware and the spam
    /// filter, then transmits. Disconnected: the transformed payload is
    /// queued and flushed FIFO on the next successful connect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed. Transport
    /// failures surface through the error callback, not here.
    pub fn send(&self, payload: impl Into<String>) -> Result<()> {
        self.command(Command::Send {
            payload: payload.into(),
        })
    }

    /// Returns the number of payloads waiting in the offline queue.
    ///
    /// Returns 0 after destroy.
    pub async fn queued_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self.command_tx.send(Command::QueuedCount { reply: tx }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

// ============================================================================
// Client - Probing
// ============================================================================

impl Client {
    /// Starts the keep-alive timer with the default `"ping"` payload.
    ///
    /// Each tick sends the ping through the normal send path while
    /// connected and skips silently while disconnected. Starting while
    /// already running replaces the previous timer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn start_keep_alive(&self, interval: Duration) -> Result<()> {
        self.command(Command::StartKeepAlive {
            interval,
            ping: None,
        })
    }

    /// Starts the keep-alive timer with a custom ping payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn start_keep_alive_with(
        &self,
        interval: Duration,
        ping: impl Into<String>,
    ) -> Result<()> {
        self.command(Command::StartKeepAlive {
            interval,
            ping: Some(ping.into()),
        })
    }

    /// Stops the keep-alive timer. Safe to call when not running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn stop_keep_alive(&self) -> Result<()> {
        self.command(Command::StopKeepAlive)
    }

    /// Starts latency tracking with the default `"ping"`/`"pong"` payloads.
    ///
    /// Each tick transmits the ping and records its send instant; an
    /// incoming payload equal to the pong value (after incoming middleware)
    /// is consumed by the prober, yields a round-trip sample and never
    /// reaches the message callback.
    ///
    /// The keep-alive and latency payload namespaces are independent:
    /// configuring a keep-alive ping equal to the latency pong value will
    /// cause the interceptor to consume it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn track_latency(&self, interval: Duration) -> Result<()> {
        self.command(Command::TrackLatency {
            interval,
            ping: None,
            pong: None,
        })
    }

    /// Starts latency tracking with custom probe payloads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn track_latency_with(
        &self,
        interval: Duration,
        ping: impl Into<String>,
        pong: impl Into<String>,
    ) -> Result<()> {
        self.command(Command::TrackLatency {
            interval,
            ping: Some(ping.into()),
            pong: Some(pong.into()),
        })
    }

    /// Disables latency tracking and stops its timer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn untrack_latency(&self) -> Result<()> {
        self.command(Command::UntrackLatency)
    }

    /// Returns the most recent round-trip sample, if any.
    ///
    /// Only the latest sample is retained; there is no aggregation. Returns
    /// `None` after destroy.
    pub async fn latency(&self) -> Option<Duration> {
        let (tx, rx) = oneshot::channel();
        if self.command_tx.send(Command::Latency { reply: tx }).is_err() {
            return None;
        }
        rx.await.unwrap_or(None)
    }
}

// ============================================================================
// Client - Policies
// ============================================================================

impl Client {
    /// Arms automatic reconnection: after an unexpected close or transport
    /// error, retry at a fixed `interval` up to `max_attempts` consecutive
    /// failures, then give up.
    ///
    /// Each retry uses the normal connect path, including its timeout and
    /// queue flush. A successful reconnect resets the attempt counter and
    /// invokes the reconnect callback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn auto_reconnect(&self, interval: Duration, max_attempts: u32) -> Result<()> {
        self.command(Command::AutoReconnect {
            interval,
            max_attempts,
        })
    }

    /// Disarms automatic reconnection and cancels a pending retry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn disable_auto_reconnect(&self) -> Result<()> {
        self.command(Command::DisableAutoReconnect)
    }

    /// Disables the spam filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn allow_spam(&self) -> Result<()> {
        self.command(Command::AllowSpam)
    }

    /// Enables the spam filter: while connected, at most one send per
    /// `interval`; excess sends are dropped (not deferred, not queued) and
    /// reported through the spam callback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn prevent_spam(&self, interval: Duration) -> Result<()> {
        self.command(Command::PreventSpam { interval })
    }

    /// Toggles verbose lifecycle lines on the log callback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn enable_verbose_logging(&self, enabled: bool) -> Result<()> {
        self.command(Command::SetVerbose { enabled })
    }

    /// Toggles offline queue persistence. Requires a store attached at
    /// build time to take effect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Destroyed`] if the client was destroyed.
    pub fn enable_queue_persistence(&self, enabled: bool) -> Result<()> {
        self.command(Command::SetPersistence { enabled })
    }
}

// ============================================================================
// Client - Callbacks & Middleware
// ============================================================================

impl Client {
    /// Sets the open callback. Replaces any previous registration.
    pub fn on_open(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.hooks.lock().open = Some(Box::new(callback));
    }

    /// Sets the close callback. Replaces any previous registration.
    pub fn on_close(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.hooks.lock().close = Some(Box::new(callback));
    }

    /// Sets the message callback. Replaces any previous registration.
    ///
    /// Receives every incoming payload after incoming middleware, except
    /// pongs consumed by the latency prober.
    pub fn on_message(&self, callback: impl Fn(String) + Send + Sync + 'static) {
        self.hooks.lock().message = Some(Box::new(callback));
    }

    /// Sets the error callback. Replaces any previous registration.
    pub fn on_error(&self, callback: impl Fn(&Error) + Send + Sync + 'static) {
        self.hooks.lock().error = Some(Box::new(callback));
    }

    /// Sets the spam callback, invoked with each payload the spam filter
    /// drops. Replaces any previous registration.
    pub fn on_spam(&self, callback: impl Fn(String) + Send + Sync + 'static) {
        self.hooks.lock().spam = Some(Box::new(callback));
    }

    /// Sets the verbose log callback. Replaces any previous registration.
    ///
    /// Lines arrive only while verbose logging is enabled.
    pub fn on_log(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        self.hooks.lock().log = Some(Box::new(callback));
    }

    /// Sets the latency callback, invoked with each new round-trip sample.
    /// Replaces any previous registration.
    pub fn on_latency(&self, callback: impl Fn(Duration) + Send + Sync + 'static) {
        self.hooks.lock().latency = Some(Box::new(callback));
    }

    /// Sets the reconnect callback, invoked after a successful reconnect
    /// with the number of attempts used. Replaces any previous registration.
    pub fn on_reconnect(&self, callback: impl Fn(u32) + Send + Sync + 'static) {
        self.hooks.lock().reconnect = Some(Box::new(callback));
    }

    /// Sets the outgoing middleware, applied to every payload inside
    /// `send()` before queueing or transmission, and to every probe payload.
    /// Replaces any previous registration; it does not chain.
    pub fn set_outgoing_middleware(
        &self,
        transform: impl Fn(String) -> String + Send + Sync + 'static,
    ) {
        self.hooks.lock().outgoing = Some(Box::new(transform));
    }

    /// Sets the incoming middleware, applied to every payload on receipt
    /// before any other processing, including pong interception. Replaces
    /// any previous registration; it does not chain.
    pub fn set_incoming_middleware(
        &self,
        transform: impl Fn(String) -> String + Send + Sync + 'static,
    ) {
        self.hooks.lock().incoming = Some(Box::new(transform));
    }

    /// Removes the outgoing middleware.
    pub fn clear_outgoing_middleware(&self) {
        self.hooks.lock().outgoing = None;
    }

    /// Removes the incoming middleware.
    pub fn clear_incoming_middleware(&self) {
        self.hooks.lock().incoming = None;
    }
}

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`].
///
/// Use [`Client::builder()`] to create one.
#[derive(Default)]
pub struct ClientBuilder {
    /// Target address.
    address: Option<String>,
    /// Transport override; defaults to [`WsTransport`].
    transport: Option<Arc<dyn Transport>>,
    /// Optional persistence store.
    store: Option<Arc<dyn QueueStore>>,
    /// Initial options.
    options: ClientOptions,
}

impl ClientBuilder {
    /// Creates a builder with no address and default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target address.
    #[inline]
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Overrides the transport implementation.
    ///
    /// Defaults to [`WsTransport`].
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attaches a persistence store for the offline queue.
    #[inline]
    #[must_use]
    pub fn store(mut self, store: Arc<dyn QueueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the initial options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the client and spawns its worker task.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidAddress`] if no address was set or it does not
    ///   parse as a URL
    pub fn build(self) -> Result<Client> {
        let address = self.validate_address()?;

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WsTransport::new()));

        let hooks = hooks::shared();
        let command_tx = worker::spawn(
            address.clone(),
            transport,
            self.store,
            self.options,
            Arc::clone(&hooks),
        );

        Ok(Client {
            address: address.into(),
            command_tx,
            hooks,
        })
    }

    /// Validates the address configuration.
    fn validate_address(&self) -> Result<String> {
        let address = self.address.clone().ok_or_else(|| {
            Error::invalid_address(
                "",
                "Target address is required. Use .address() to set it.\n\
                 Example: Client::builder().address(\"ws://127.0.0.1:9000\")",
            )
        })?;

        Url::parse(&address)
            .map_err(|e| Error::invalid_address(&address, e.to_string()))?;

        Ok(address)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_address() {
        let result = ClientBuilder::new().validate_address();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("address is required"));
    }

    #[test]
    fn test_builder_rejects_unparseable_address() {
        let result = ClientBuilder::new()
            .address("not a url at all")
            .validate_address();
        assert!(matches!(result, Err(Error::InvalidAddress { .. })));
    }

    #[test]
    fn test_builder_accepts_ws_address() {
        let result = ClientBuilder::new()
            .address("ws://127.0.0.1:9000/socket")
            .validate_address();
        assert_eq!(result.expect("valid"), "ws://127.0.0.1:9000/socket");
    }

    #[tokio::test]
    async fn test_new_spawns_worker() {
        let client = Client::new("ws://127.0.0.1:9000").expect("client");
        assert_eq!(client.address(), "ws://127.0.0.1:9000");
        assert!(!client.is_connected().await);
        client.destroy();
    }

    #[tokio::test]
    async fn test_operations_after_destroy() {
        let client = Client::new("ws://127.0.0.1:9000").expect("client");
        client.destroy();
        // Destroy is idempotent.
        client.destroy();

        // The worker drains in the background; eventually the channel
        // closes and operations report Destroyed.
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }

        assert!(matches!(client.send("x"), Err(Error::Destroyed)));
        assert!(!client.is_connected().await);
        assert_eq!(client.latency().await, None);
        assert_eq!(client.queued_count().await, 0);
    }

    #[test]
    fn test_debug_format() {
        // Debug impl does not require a runtime (no worker interaction).
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let _guard = rt.enter();

        let client = Client::new("ws://127.0.0.1:9000").expect("client");
        let output = format!("{client:?}");
        assert!(output.contains("Client"));
        assert!(output.contains("ws://127.0.0.1:9000"));
        client.destroy();
    }
}
