//! Client worker task and event loop.
//!
//! All mutable client state lives here, owned by a single task: the
//! transport link, the outbound queue, the reconnection policy, both probe
//! timers and the runtime options. The loop multiplexes the command channel,
//! transport notifications, probe ticks and the reconnect deadline, so no
//! two state mutations or callbacks ever run concurrently.
//!
//! # Event Loop
//!
//! The worker handles:
//!
//! - Commands from the [`Client`](crate::Client) handle
//! - Incoming transport events (messages, errors, closure)
//! - Keep-alive and latency probe ticks
//! - The pending reconnect deadline

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::store::QueueStore;
use crate::transport::{LinkEvent, Transport, TransportLink};

use super::hooks::SharedHooks;
use super::options::ClientOptions;
use super::probe::{KeepAlive, LatencyTracker};
use super::queue::OutboundQueue;
use super::reconnect::ReconnectPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Store key prefix for the persisted queue, suffixed with the target
/// address so clients with different targets never collide.
const QUEUE_KEY_PREFIX: &str = "outbound-queue:";

// ============================================================================
// Command
// ============================================================================

/// Commands sent from the client handle to the worker.
pub(crate) enum Command {
    /// Connect and reply once the queue has been flushed.
    Connect {
        /// Deadline override; `None` uses the configured default.
        timeout: Option<Duration>,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Transmit or queue a payload.
    Send { payload: String },
    /// Close the connection without reconnecting.
    Disconnect,
    /// Tear down the worker.
    Destroy,
    /// Report whether a transport link is currently held.
    IsConnected { reply: oneshot::Sender<bool> },
    /// Report the outbound queue depth.
    QueuedCount { reply: oneshot::Sender<usize> },
    /// Report the most recent latency sample.
    Latency { reply: oneshot::Sender<Option<Duration>> },
    /// Arm the keep-alive timer.
    StartKeepAlive {
        interval: Duration,
        ping: Option<String>,
    },
    /// Cancel the keep-alive timer.
    StopKeepAlive,
    /// Arm the latency probe timer.
    TrackLatency {
        interval: Duration,
        ping: Option<String>,
        pong: Option<String>,
    },
    /// Disable latency tracking.
    UntrackLatency,
    /// Arm automatic reconnection.
    AutoReconnect {
        interval: Duration,
        max_attempts: u32,
    },
    /// Disarm automatic reconnection.
    DisableAutoReconnect,
    /// Disable the spam filter.
    AllowSpam,
    /// Enable the spam filter with a minimum inter-send interval.
    PreventSpam { interval: Duration },
    /// Toggle verbose lifecycle logging.
    SetVerbose { enabled: bool },
    /// Toggle offline queue persistence.
    SetPersistence { enabled: bool },
}

// ============================================================================
// Worker
// ============================================================================

/// Owns all client state and runs the event loop.
pub(crate) struct Worker {
    /// Target address.
    address: String,
    /// Transport factory, shared across reconnect attempts.
    transport: Arc<dyn Transport>,
    /// Optional persistence collaborator.
    store: Option<Arc<dyn QueueStore>>,
    /// Store key for the persisted queue.
    store_key: String,
    /// Callback and middleware slots, shared with the handle.
    hooks: SharedHooks,
    /// Command channel from the handle.
    commands: mpsc::UnboundedReceiver<Command>,
    /// Current transport link. Present iff the transport reports open; this
    /// is the sole source of truth for connection state.
    link: Option<Box<dyn TransportLink>>,
    /// Payloads accepted while disconnected.
    queue: OutboundQueue,
    /// Reconnection policy state.
    reconnect: ReconnectPolicy,
    /// Pending reconnect deadline.
    retry_at: Option<Instant>,
    /// Keep-alive probe.
    keep_alive: KeepAlive,
    /// Latency probe.
    latency: LatencyTracker,
    /// Runtime options.
    options: ClientOptions,
    /// Instant of the last transmitted payload, for the spam filter.
    last_transmit: Option<Instant>,
    /// Set by an explicit disconnect so a trailing close event does not
    /// trigger reconnection.
    explicit_close: bool,
}

// ============================================================================
// Worker - Spawn
// ============================================================================

/// Spawns the worker task and returns its command sender.
pub(crate) fn spawn(
    address: String,
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn QueueStore>>,
    options: ClientOptions,
    hooks: SharedHooks,
) -> mpsc::UnboundedSender<Command> {
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let mut reconnect = ReconnectPolicy::new();
    if options.auto_reconnect {
        reconnect.arm(options.reconnect_interval, options.max_reconnect_attempts, false);
    }

    let worker = Worker {
        store_key: format!("{QUEUE_KEY_PREFIX}{address}"),
        address,
        transport,
        store,
        hooks,
        commands: command_rx,
        link: None,
        queue: OutboundQueue::new(),
        reconnect,
        retry_at: None,
        keep_alive: KeepAlive::new(),
        latency: LatencyTracker::new(),
        options,
        last_transmit: None,
        explicit_close: false,
    };

    tokio::spawn(worker.run());

    command_tx
}

// ============================================================================
// Worker - Event Loop
// ============================================================================

impl Worker {
    /// Runs the event loop until destroyed or all handles are dropped.
    async fn run(mut self) {
        debug!(address = %self.address, "Client worker started");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => {
                            if self.handle_command(command).await {
                                break;
                            }
                        }
                        None => {
                            debug!("All client handles dropped");
                            break;
                        }
                    }
                }

                event = Self::link_event(&mut self.link) => {
                    self.handle_link_event(event);
                }

                _ = self.keep_alive.tick() => {
                    self.keep_alive_tick().await;
                }

                _ = self.latency.tick() => {
                    self.latency_tick().await;
                }

                _ = Self::retry_timer(self.retry_at) => {
                    self.retry_at = None;
                    self.attempt_reconnect().await;
                }
            }
        }

        self.shutdown().await;
        debug!(address = %self.address, "Client worker terminated");
    }

    /// Waits for the next transport event; pends forever while disconnected.
    async fn link_event(link: &mut Option<Box<dyn TransportLink>>) -> LinkEvent {
        match link.as_mut() {
            Some(link) => link.next_event().await,
            None => std::future::pending().await,
        }
    }

    /// Waits for the reconnect deadline; pends forever when none is set.
    async fn retry_timer(deadline: Option<Instant>) {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

// ============================================================================
// Worker - Command Handling
// ============================================================================

impl Worker {
    /// Dispatches one command. Returns `true` when the worker must stop.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Connect { timeout, reply } => {
                let timeout = timeout.unwrap_or(self.options.connect_timeout);
                let result = self.do_connect(timeout).await;
                let _ = reply.send(result);
            }

            Command::Send { payload } => {
                self.dispatch_send(payload).await;
            }

            Command::Disconnect => {
                self.handle_disconnect().await;
            }

            Command::Destroy => {
                return true;
            }

            Command::IsConnected { reply } => {
                let _ = reply.send(self.link.is_some());
            }

            Command::QueuedCount { reply } => {
                let _ = reply.send(self.queue.len());
            }

            Command::Latency { reply } => {
                let _ = reply.send(self.latency.latency());
            }

            Command::StartKeepAlive { interval, ping } => {
                debug!(interval_ms = interval.as_millis() as u64, "Keep-alive started");
                self.keep_alive.start(interval, ping);
            }

            Command::StopKeepAlive => {
                if self.keep_alive.is_running() {
                    debug!("Keep-alive stopped");
                }
                self.keep_alive.stop();
            }

            Command::TrackLatency {
                interval,
                ping,
                pong,
            } => {
                debug!(interval_ms = interval.as_millis() as u64, "Latency tracking started");
                self.latency.start(interval, ping, pong);
            }

            Command::UntrackLatency => {
                self.latency.stop();
            }

            Command::AutoReconnect {
                interval,
                max_attempts,
            } => {
                debug!(
                    interval_ms = interval.as_millis() as u64,
                    max_attempts, "Auto-reconnect armed"
                );
                self.options.auto_reconnect = true;
                self.reconnect.arm(interval, max_attempts, self.link.is_some());
            }

            Command::DisableAutoReconnect => {
                if self.reconnect.is_armed() {
                    debug!("Auto-reconnect disarmed");
                }
                self.options.auto_reconnect = false;
                self.reconnect.disarm();
                self.retry_at = None;
            }

            Command::AllowSpam => {
                self.options.spam_interval = None;
            }

            Command::PreventSpam { interval } => {
                self.options.spam_interval = Some(interval);
            }

            Command::SetVerbose { enabled } => {
                self.options.verbose = enabled;
            }

            Command::SetPersistence { enabled } => {
                if enabled && self.store.is_none() {
                    warn!("Queue persistence enabled without a store attached");
                }
                self.options.persist_queue = enabled;
            }
        }

        false
    }
}

// ============================================================================
// Worker - Connection Management
// ============================================================================

impl Worker {
    /// Opens the transport, loads the persisted queue, invokes the open
    /// callback and flushes the queue, in that order. The caller's reply is
    /// sent only after this returns, so the flush always completes before
    /// the connect result is fulfilled.
    async fn do_connect(&mut self, connect_timeout: Duration) -> Result<()> {
        if let Some(mut stale) = self.link.take() {
            debug!("Replacing existing connection");
            stale.close().await;
        }
        self.explicit_close = false;
        self.verbose_log("connecting");

        let opened =
            tokio::time::timeout(connect_timeout, self.transport.open(&self.address)).await;

        let link = match opened {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                debug!(error = %e, "Connect failed");
                return Err(e);
            }
            Err(_) => {
                debug!(timeout_ms = connect_timeout.as_millis() as u64, "Connect timed out");
                return Err(Error::connect_timeout(connect_timeout.as_millis() as u64));
            }
        };

        self.link = Some(link);
        self.retry_at = None;
        self.reconnect.mark_connected();
        self.verbose_log("connected");

        self.load_persisted_queue();
        self.emit_open();
        self.flush_queue().await;
        self.persist_queue();

        Ok(())
    }

    /// Closes the link on an explicit disconnect. Never reconnects.
    async fn handle_disconnect(&mut self) {
        let Some(mut link) = self.link.take() else {
            trace!("Disconnect ignored, no active link");
            return;
        };

        self.explicit_close = true;
        self.retry_at = None;
        link.close().await;
        self.reconnect.mark_idle();
        self.verbose_log("disconnected");
        self.emit_close();
        debug!("Disconnected");
    }

    /// Reacts to a transport notification.
    fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Message(raw) => {
                let payload = self.apply_incoming(raw);

                if self.latency.matches_pong(&payload) {
                    if let Some(sample) = self.latency.sample_round_trip() {
                        trace!(rtt_ms = sample.as_millis() as u64, "Latency sample");
                        self.emit_latency(sample);
                    }
                    // Consumed by the prober; never reaches the message
                    // callback.
                    return;
                }

                self.emit_message(payload);
            }

            LinkEvent::Error(message) => {
                warn!(error = %message, "Transport error");
                self.link = None;
                self.emit_error(Error::transport(message));
                self.on_connection_lost();
            }

            LinkEvent::Closed => {
                debug!("Transport closed");
                self.link = None;
                self.verbose_log("connection closed");
                self.emit_close();
                if !self.explicit_close {
                    self.on_connection_lost();
                }
            }
        }
    }

    /// Consults the reconnection policy after an unexpected loss.
    fn on_connection_lost(&mut self) {
        match self.reconnect.on_connection_lost() {
            Some(delay) => {
                debug!(delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
                self.verbose_log("reconnect scheduled");
                self.retry_at = Some(Instant::now() + delay);
            }
            None => {
                trace!(state = ?self.reconnect.state(), "No reconnect scheduled");
            }
        }
    }

    /// Runs one reconnect attempt when the deadline fires.
    async fn attempt_reconnect(&mut self) {
        let attempt = self.reconnect.attempts() + 1;
        debug!(attempt, "Reconnect attempt");

        match self.do_connect(self.options.connect_timeout).await {
            Ok(()) => {
                self.verbose_log("reconnected");
                self.emit_reconnect(attempt);
            }
            Err(e) => {
                warn!(attempt, error = %e, "Reconnect attempt failed");
                match self.reconnect.on_retry_failed() {
                    Some(delay) => {
                        self.retry_at = Some(Instant::now() + delay);
                    }
                    None => {
                        warn!(attempts = self.reconnect.attempts(), "Reconnect attempts exhausted");
                        self.verbose_log("reconnect attempts exhausted");
                    }
                }
            }
        }
    }

    /// Releases every resource: reconnection, timers, link.
    async fn shutdown(&mut self) {
        self.reconnect.disarm();
        self.retry_at = None;
        self.keep_alive.stop();
        self.latency.stop();

        if let Some(mut link) = self.link.take() {
            link.close().await;
            self.emit_close();
        }

        self.verbose_log("destroyed");
    }
}

// ============================================================================
// Worker - Send Path
// ============================================================================

impl Worker {
    /// Applies outgoing middleware, then transmits (connected) or queues
    /// (disconnected). A payload is never both transmitted and queued.
    async fn dispatch_send(&mut self, payload: String) {
        let payload = self.apply_outgoing(payload);

        if self.link.is_some() {
            if self.spam_blocked() {
                debug!("Send dropped by spam filter");
                self.verbose_log("send dropped by spam filter");
                self.emit_spam(payload);
                return;
            }
            self.transmit(payload).await;
        } else {
            self.queue.push(payload);
            trace!(queued = self.queue.len(), "Payload queued while disconnected");
            self.verbose_log("payload queued while disconnected");
            self.persist_queue();
        }
    }

    /// Returns `true` when the spam filter blocks a send right now.
    fn spam_blocked(&self) -> bool {
        match (self.options.spam_interval, self.last_transmit) {
            (Some(min_interval), Some(last)) => last.elapsed() < min_interval,
            _ => false,
        }
    }

    /// Hands a payload to the link and advances the spam clock.
    async fn transmit(&mut self, payload: String) {
        let Some(link) = self.link.as_mut() else {
            self.emit_error(Error::NotConnected);
            return;
        };

        let result = link.send(&payload).await;
        match result {
            Ok(()) => {
                self.last_transmit = Some(Instant::now());
                trace!("Payload transmitted");
            }
            Err(e) => {
                warn!(error = %e, "Send failed");
                self.emit_error(e);
            }
        }
    }

    /// Flushes the queue FIFO, handing each payload directly to the link.
    ///
    /// Flushed payloads bypass the spam filter and do not advance its
    /// clock: they already waited. A failed send stops the flush; the
    /// remaining payloads stay queued.
    async fn flush_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        debug!(count = self.queue.len(), "Flushing outbound queue");
        self.verbose_log("flushing outbound queue");

        while !self.queue.is_empty() {
            let Some(link) = self.link.as_mut() else {
                break;
            };
            let Some(payload) = self.queue.pop() else {
                break;
            };

            let result = link.send(&payload).await;
            if let Err(e) = result {
                warn!(error = %e, remaining = self.queue.len(), "Flush interrupted");
                self.emit_error(e);
                break;
            }
        }
    }
}

// ============================================================================
// Worker - Probe Ticks
// ============================================================================

impl Worker {
    /// Sends the keep-alive ping through the normal send path (outgoing
    /// middleware and spam filter apply). Skips silently while disconnected.
    async fn keep_alive_tick(&mut self) {
        if self.link.is_none() {
            trace!("Keep-alive tick skipped, not connected");
            return;
        }

        let ping = self.keep_alive.ping().to_string();
        self.dispatch_send(ping).await;
    }

    /// Transmits the latency probe and records its send instant.
    ///
    /// Probes bypass the spam filter so the recorded instant always belongs
    /// to a probe that was actually transmitted.
    async fn latency_tick(&mut self) {
        if self.link.is_none() {
            trace!("Latency tick skipped, not connected");
            return;
        }

        let ping = self.apply_outgoing(self.latency.ping().to_string());

        let Some(link) = self.link.as_mut() else {
            return;
        };
        let result = link.send(&ping).await;
        match result {
            Ok(()) => self.latency.record_probe(Instant::now()),
            Err(e) => {
                warn!(error = %e, "Latency probe send failed");
                self.emit_error(e);
            }
        }
    }
}

// ============================================================================
// Worker - Persistence
// ============================================================================

impl Worker {
    /// Mirrors the queue to the store after a change, when enabled.
    fn persist_queue(&self) {
        if !self.options.persist_queue {
            return;
        }
        let Some(store) = &self.store else {
            return;
        };

        match self.queue.serialize() {
            Ok(json) => {
                if let Err(e) = store.set(&self.store_key, &json) {
                    warn!(error = %e, "Failed to persist outbound queue");
                    self.emit_error(e);
                }
            }
            Err(e) => self.emit_error(e),
        }
    }

    /// Loads the persisted queue at the start of a successful connect.
    ///
    /// The persisted copy replaces the in-memory queue. A store failure is
    /// logged and never fails the connect.
    fn load_persisted_queue(&mut self) {
        if !self.options.persist_queue {
            return;
        }
        let Some(store) = &self.store else {
            return;
        };

        match store.get(&self.store_key) {
            Ok(Some(json)) => match OutboundQueue::deserialize(&json) {
                Ok(items) => {
                    debug!(count = items.len(), "Loaded persisted queue");
                    self.queue.replace(items);
                }
                Err(e) => warn!(error = %e, "Persisted queue is corrupt, keeping in-memory queue"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to load persisted queue"),
        }
    }
}

// ============================================================================
// Worker - Callbacks & Middleware
// ============================================================================

impl Worker {
    /// Applies the outgoing middleware, if registered.
    fn apply_outgoing(&self, payload: String) -> String {
        match &self.hooks.lock().outgoing {
            Some(transform) => transform(payload),
            None => payload,
        }
    }

    /// Applies the incoming middleware, if registered.
    fn apply_incoming(&self, payload: String) -> String {
        match &self.hooks.lock().incoming {
            Some(transform) => transform(payload),
            None => payload,
        }
    }

    fn emit_open(&self) {
        if let Some(cb) = &self.hooks.lock().open {
            cb();
        }
    }

    fn emit_close(&self) {
        if let Some(cb) = &self.hooks.lock().close {
            cb();
        }
    }

    fn emit_message(&self, payload: String) {
        if let Some(cb) = &self.hooks.lock().message {
            cb(payload);
        }
    }

    fn emit_error(&self, error: Error) {
        if let Some(cb) = &self.hooks.lock().error {
            cb(&error);
        }
    }

    fn emit_spam(&self, payload: String) {
        if let Some(cb) = &self.hooks.lock().spam {
            cb(payload);
        }
    }

    fn emit_latency(&self, sample: Duration) {
        if let Some(cb) = &self.hooks.lock().latency {
            cb(sample);
        }
    }

    fn emit_reconnect(&self, attempts: u32) {
        if let Some(cb) = &self.hooks.lock().reconnect {
            cb(attempts);
        }
    }

    /// Emits a verbose lifecycle line when verbose logging is enabled.
    fn verbose_log(&self, line: &str) {
        if !self.options.verbose {
            return;
        }
        if let Some(cb) = &self.hooks.lock().log {
            cb(line);
        }
    }
}
