//! Reconnecting socket client with frame fan-out.
//!
//! DESIGN
//! ======
//! Each [`SocketClient`] owns one driver task. Handles talk to the driver
//! over an unbounded command channel and read session state through a
//! `watch` channel, so every handle sees the same snapshot. The driver is an
//! explicit state machine:
//!
//! ```text
//! Connecting ──ok──▶ Open ──close/error──▶ Backoff ──timer──▶ Connecting
//!     │ fail                                   ▲
//!     └────────────────────────────────────────┘
//! any phase ──disconnect()──▶ Idle ──reconnect()──▶ Connecting
//! ```
//!
//! Backoff arithmetic lives in [`Reconnector`] so it can be tested without a
//! runtime. The driver exits once every handle is dropped.
//!
//! DELIVERY
//! ========
//! Inbound text is decoded on the driver task and handed to every registered
//! handler in arrival order. Text that fails to decode updates nothing; it is
//! only reported to the optional decode-error hook. Outbound frames are
//! written only while open and dropped otherwise; there is no queue.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use frames::{CodecError, IncomingFrame, OutgoingFrame};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::transport::{Connection, Transport, TransportError, WsTransport};
use crate::config::ReconnectConfig;

/// Connection lifecycle as seen by consumers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    /// Closed, either voluntarily or while waiting to retry after a close.
    #[default]
    Disconnected,
    /// The last attempt or connection failed; a retry may be pending.
    Error,
}

/// Read-only view of the session published after every state change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    /// Involuntary closes since the last successful open.
    pub retry_count: u32,
    /// Most recent successfully decoded inbound frame.
    pub last_message: Option<IncomingFrame>,
}

pub type MessageHandler = Arc<dyn Fn(&IncomingFrame) + Send + Sync>;
pub type DecodeErrorHandler = Arc<dyn Fn(&str, &CodecError) + Send + Sync>;

// =============================================================================
// RECONNECTOR
// =============================================================================

/// Pure retry bookkeeping for one socket session.
#[derive(Clone, Debug)]
pub struct Reconnector {
    config: ReconnectConfig,
    retry_count: u32,
    stopped: bool,
}

impl Reconnector {
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            retry_count: 0,
            stopped: false,
        }
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn on_open(&mut self) {
        self.retry_count = 0;
    }

    /// Delay before the next attempt, or `None` once stopped.
    ///
    /// The delay uses the count before this close; the count then grows by
    /// one.
    pub fn on_involuntary_close(&mut self) -> Option<Duration> {
        if self.stopped {
            return None;
        }
        let delay = self.config.delay_for(self.retry_count);
        self.retry_count = self.retry_count.saturating_add(1);
        Some(delay)
    }

    /// Halt retries until [`Reconnector::restart`].
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn restart(&mut self) {
        self.stopped = false;
        self.retry_count = 0;
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Default)]
struct Handlers {
    message: Mutex<Vec<MessageHandler>>,
    decode_error: Mutex<Option<DecodeErrorHandler>>,
}

impl Handlers {
    fn add(&self, handler: MessageHandler) -> bool {
        let mut handlers = self.message.lock().unwrap_or_else(PoisonError::into_inner);
        if handlers.iter().any(|existing| Arc::ptr_eq(existing, &handler)) {
            return false;
        }
        handlers.push(handler);
        true
    }

    fn remove(&self, handler: &MessageHandler) -> bool {
        let mut handlers = self.message.lock().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|existing| !Arc::ptr_eq(existing, handler));
        handlers.len() != before
    }

    fn deliver(&self, frame: &IncomingFrame) {
        // Snapshot first so a handler may register another without deadlock.
        let handlers = self
            .message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in handlers {
            handler(frame);
        }
    }

    fn decode_failed(&self, text: &str, error: &CodecError) {
        let hook = self
            .decode_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            hook(text, error);
        }
    }
}

// =============================================================================
// CLIENT HANDLE
// =============================================================================

#[derive(Debug)]
enum Command {
    Send(String),
    Disconnect,
    Reconnect,
}

/// Cloneable handle to one reconnecting socket session.
#[derive(Clone)]
pub struct SocketClient {
    url: Arc<str>,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionSnapshot>,
    handlers: Arc<Handlers>,
}

impl SocketClient {
    /// Start a websocket session to `url`. Must be called inside a Tokio
    /// runtime; the first attempt starts immediately.
    #[must_use]
    pub fn connect(url: impl Into<String>, config: ReconnectConfig) -> Self {
        Self::with_transport(url, WsTransport, config)
    }

    /// Start a session over an arbitrary transport.
    #[must_use]
    pub fn with_transport<T: Transport>(
        url: impl Into<String>,
        transport: T,
        config: ReconnectConfig,
    ) -> Self {
        let url: Arc<str> = Arc::from(url.into());
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SessionSnapshot::default());
        let handlers = Arc::new(Handlers::default());

        let driver = Driver {
            url: Arc::clone(&url),
            transport: Arc::new(transport),
            reconnector: Reconnector::new(config),
            commands: command_rx,
            state: state_tx,
            handlers: Arc::clone(&handlers),
        };
        tokio::spawn(driver.run());

        Self {
            url,
            commands,
            state,
            handlers,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Encode and write `frame` if the connection is open; otherwise drop it.
    pub fn send(&self, frame: &OutgoingFrame) {
        let _ = self.commands.send(Command::Send(frames::encode_frame(frame)));
    }

    /// Close the connection and stop retrying until [`SocketClient::reconnect`].
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Reset retry state, drop any current connection and connect afresh.
    pub fn reconnect(&self) {
        let _ = self.commands.send(Command::Reconnect);
    }

    /// Register `handler` for every decoded inbound frame.
    ///
    /// Returns `false` when this exact handler is already registered.
    pub fn on_message(&self, handler: MessageHandler) -> bool {
        self.handlers.add(handler)
    }

    pub fn remove_handler(&self, handler: &MessageHandler) -> bool {
        self.handlers.remove(handler)
    }

    /// Observe inbound text that failed to decode. Replaces any prior hook.
    pub fn on_decode_error(&self, hook: DecodeErrorHandler) {
        *self
            .handlers
            .decode_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.state.borrow().status
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.state.borrow().retry_count
    }

    #[must_use]
    pub fn last_message(&self) -> Option<IncomingFrame> {
        self.state.borrow().last_message.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// A receiver that wakes on every published state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Wait until the session reaches `status`. Returns `false` if the
    /// driver has exited.
    pub async fn wait_for_status(&self, status: ConnectionStatus) -> bool {
        let mut state = self.state.clone();
        state.wait_for(|snapshot| snapshot.status == status).await.is_ok()
    }
}

// =============================================================================
// DRIVER
// =============================================================================

enum Phase {
    Connecting,
    Open(Connection),
    Backoff(Duration),
    Idle,
}

struct Driver<T> {
    url: Arc<str>,
    transport: Arc<T>,
    reconnector: Reconnector,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<SessionSnapshot>,
    handlers: Arc<Handlers>,
}

impl<T: Transport> Driver<T> {
    async fn run(mut self) {
        let mut phase = Phase::Connecting;
        loop {
            let next = match phase {
                Phase::Connecting => self.connect().await,
                Phase::Open(connection) => self.pump(connection).await,
                Phase::Backoff(delay) => self.backoff(delay).await,
                Phase::Idle => self.idle().await,
            };
            let Some(next) = next else {
                debug!(url = %self.url, "socket handles dropped; driver exiting");
                return;
            };
            phase = next;
        }
    }

    async fn connect(&mut self) -> Option<Phase> {
        self.publish(|s| s.status = ConnectionStatus::Connecting);

        let transport = Arc::clone(&self.transport);
        let url = Arc::clone(&self.url);
        let open = async move { transport.open(&url).await };
        tokio::pin!(open);

        loop {
            tokio::select! {
                result = &mut open => {
                    return Some(match result {
                        Ok(connection) => {
                            self.reconnector.on_open();
                            info!(url = %self.url, "socket connected");
                            self.publish(|s| {
                                s.status = ConnectionStatus::Connected;
                                s.retry_count = 0;
                            });
                            Phase::Open(connection)
                        }
                        Err(error) => {
                            warn!(url = %self.url, error = %error, "socket open failed");
                            self.publish(|s| s.status = ConnectionStatus::Error);
                            self.schedule_retry()
                        }
                    });
                }
                command = self.commands.recv() => {
                    let command = command?;
                    if let Some(next) = self.offline_command(command) {
                        return Some(next);
                    }
                }
            }
        }
    }

    async fn pump(&mut self, mut connection: Connection) -> Option<Phase> {
        loop {
            tokio::select! {
                inbound = connection.inbound.next() => match inbound {
                    Some(Ok(text)) => self.dispatch(&text),
                    Some(Err(TransportError::Closed)) | None => {
                        info!(url = %self.url, "socket closed by peer");
                        self.publish(|s| s.status = ConnectionStatus::Disconnected);
                        return Some(self.schedule_retry());
                    }
                    Some(Err(error)) => {
                        warn!(url = %self.url, error = %error, "socket transport failed");
                        self.publish(|s| s.status = ConnectionStatus::Error);
                        return Some(self.schedule_retry());
                    }
                },
                command = self.commands.recv() => match command {
                    None => {
                        let _ = connection.outbound.close().await;
                        return None;
                    }
                    Some(Command::Send(text)) => {
                        if let Err(error) = connection.outbound.send(text).await {
                            warn!(url = %self.url, error = %error, "socket write failed");
                            self.publish(|s| s.status = ConnectionStatus::Error);
                            return Some(self.schedule_retry());
                        }
                    }
                    Some(Command::Disconnect) => {
                        let _ = connection.outbound.close().await;
                        return self.offline_command(Command::Disconnect);
                    }
                    Some(Command::Reconnect) => {
                        let _ = connection.outbound.close().await;
                        return self.offline_command(Command::Reconnect);
                    }
                },
            }
        }
    }

    async fn backoff(&mut self, delay: Duration) -> Option<Phase> {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return Some(Phase::Connecting),
                command = self.commands.recv() => {
                    let command = command?;
                    if let Some(next) = self.offline_command(command) {
                        return Some(next);
                    }
                }
            }
        }
    }

    async fn idle(&mut self) -> Option<Phase> {
        loop {
            let command = self.commands.recv().await?;
            if let Some(Phase::Connecting) = self.offline_command(command) {
                return Some(Phase::Connecting);
            }
        }
    }

    /// Apply a command received while no connection is open.
    /// `None` means stay in the current phase.
    fn offline_command(&mut self, command: Command) -> Option<Phase> {
        match command {
            Command::Send(_) => {
                debug!(url = %self.url, "socket not open; dropping outbound frame");
                None
            }
            Command::Disconnect => {
                self.reconnector.stop();
                info!(url = %self.url, "socket disconnected");
                self.publish(|s| s.status = ConnectionStatus::Disconnected);
                Some(Phase::Idle)
            }
            Command::Reconnect => {
                self.reconnector.restart();
                self.publish(|s| s.retry_count = 0);
                Some(Phase::Connecting)
            }
        }
    }

    fn schedule_retry(&mut self) -> Phase {
        let Some(delay) = self.reconnector.on_involuntary_close() else {
            return Phase::Idle;
        };
        let retry_count = self.reconnector.retry_count();
        debug!(url = %self.url, retry_count, delay_ms = delay.as_millis(), "socket retry scheduled");
        self.publish(|s| s.retry_count = retry_count);
        Phase::Backoff(delay)
    }

    fn dispatch(&self, text: &str) {
        match frames::decode_frame(text) {
            Ok(frame) => {
                self.publish(|s| s.last_message = Some(frame.clone()));
                self.handlers.deliver(&frame);
            }
            Err(error) => {
                debug!(url = %self.url, error = %error, "dropping malformed inbound frame");
                self.handlers.decode_failed(text, &error);
            }
        }
    }

    fn publish(&self, update: impl FnOnce(&mut SessionSnapshot)) {
        self.state.send_modify(update);
    }
}

#[cfg(test)]
#[path = "socket_test.rs"]
mod socket_test;
