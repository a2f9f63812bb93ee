//! Connection lifecycle and event loop.
//!
//! A single tokio task owns the WebSocket and the current [`Session`].
//! Client handles talk to it through an unbounded command channel, so all
//! session state is mutated from this one task.
//!
//! # States
//!
//! ```text
//!                connect()              host accepts
//! Disconnected ───────────► Connecting ─────────────► Connected
//!      ▲  ▲                     │                         │
//!      │  └──── attempt fails ──┘                         │
//!      │                                                  │
//!      └──────── host closes / error / disconnect() ──────┘
//!
//! Disconnected ──(reconnect delay)──► Connecting   unless suppressed
//! ```
//!
//! # Event Loop
//!
//! - Calls issued while not connected are encoded and queued
//! - On connect the status callback runs, then the queue is flushed in order
//! - On disconnect the status callback runs, the session is replaced and a
//!   reconnect is scheduled if the callback (or its absence) allows it

// ============================================================================
// Imports
// ============================================================================

use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use crate::error::Error;
use crate::protocol::{Call, Frame};
use crate::session::{Completion, Session};

use super::Endpoint;

// ============================================================================
// Constants
// ============================================================================

/// Wait between a disconnect and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

// ============================================================================
// Types
// ============================================================================

/// Connection status callback.
///
/// Called with `true` once connected and with `false` whenever the
/// connection is lost or an attempt fails. Returning `false` from a
/// disconnect notification stops automatic reconnection.
pub type StatusCallback = Box<dyn FnMut(bool) -> bool + Send>;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection; a reconnect may be scheduled.
    #[default]
    Disconnected,
    /// WebSocket handshake in progress.
    Connecting,
    /// Frames are written immediately.
    Connected,
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Requests from client handles to the connection task.
pub(crate) enum ConnectionCommand {
    /// Start connecting (clears a previous `Disconnect`).
    Connect,
    /// Close and stop reconnecting.
    Disconnect,
    /// Route a classified call.
    Dispatch {
        call: Call,
        completion: Completion,
    },
}

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Settings the connection task is started with.
pub(crate) struct ConnectionConfig {
    pub(crate) endpoint: Endpoint,
    pub(crate) reconnect_delay: Duration,
    pub(crate) on_status: Option<StatusCallback>,
}

// ============================================================================
// Phase
// ============================================================================

/// Where the event loop currently is.
enum Phase {
    /// Disconnected, waiting for `connect()`.
    Idle,
    /// Disconnected, reconnecting at the deadline.
    Waiting(Instant),
    /// Handshake pending.
    Connecting,
    /// Socket open.
    Connected(Box<WsStream>),
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Event loop state. Lives inside the spawned task.
pub(crate) struct ConnectionManager {
    url: String,
    reconnect_delay: Duration,
    on_status: Option<StatusCallback>,
    state: Arc<Mutex<ConnectionState>>,
    session: Session,
    suppress_reconnect: bool,
    command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
}

impl ConnectionManager {
    /// Spawns the connection task in the disconnected state.
    ///
    /// The task exits once every sender is dropped.
    pub(crate) fn spawn(
        config: ConnectionConfig,
        state: Arc<Mutex<ConnectionState>>,
    ) -> mpsc::UnboundedSender<ConnectionCommand> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let manager = Self {
            url: config.endpoint.ws_url(),
            reconnect_delay: config.reconnect_delay,
            on_status: config.on_status,
            state,
            session: Session::new(),
            suppress_reconnect: false,
            command_rx,
        };

        tokio::spawn(manager.run());

        command_tx
    }

    async fn run(mut self) {
        let mut phase = Phase::Idle;

        loop {
            let next = match phase {
                Phase::Idle => self.idle().await,
                Phase::Waiting(deadline) => self.waiting(deadline).await,
                Phase::Connecting => self.connecting().await,
                Phase::Connected(ws) => self.connected(*ws).await,
            };

            match next {
                Some(p) => phase = p,
                None => break,
            }
        }

        self.session.close();
        self.set_state(ConnectionState::Disconnected);

        debug!("Connection task terminated");
    }

    /// Disconnected with no reconnect scheduled.
    async fn idle(&mut self) -> Option<Phase> {
        loop {
            match self.command_rx.recv().await? {
                ConnectionCommand::Connect => return Some(self.begin_connect()),
                ConnectionCommand::Disconnect => self.suppress_reconnect = true,
                ConnectionCommand::Dispatch { call, completion } => self.queue(call, completion),
            }
        }
    }

    /// Disconnected with a reconnect scheduled at `deadline`.
    async fn waiting(&mut self, deadline: Instant) -> Option<Phase> {
        loop {
            tokio::select! {
                () = sleep_until(deadline) => return Some(Phase::Connecting),

                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        return None;
                    };

                    match command {
                        ConnectionCommand::Connect => return Some(self.begin_connect()),

                        ConnectionCommand::Disconnect => {
                            self.suppress_reconnect = true;
                            debug!("Scheduled reconnect cancelled");
                            return Some(Phase::Idle);
                        }

                        ConnectionCommand::Dispatch { call, completion } => {
                            self.queue(call, completion);
                        }
                    }
                }
            }
        }
    }

    /// WebSocket handshake in flight.
    async fn connecting(&mut self) -> Option<Phase> {
        self.set_state(ConnectionState::Connecting);
        debug!(url = %self.url, "Connecting");

        let connect = connect_async(self.url.clone());
        tokio::pin!(connect);

        loop {
            tokio::select! {
                result = &mut connect => {
                    return Some(match result {
                        Ok((ws, _)) => Phase::Connected(Box::new(ws)),
                        Err(e) => {
                            warn!(url = %self.url, error = %e, "Connection attempt failed");
                            self.on_close()
                        }
                    });
                }

                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        return None;
                    };

                    match command {
                        ConnectionCommand::Connect => debug!("Connect ignored, already connecting"),

                        ConnectionCommand::Disconnect => {
                            self.suppress_reconnect = true;
                            return Some(self.on_close());
                        }

                        ConnectionCommand::Dispatch { call, completion } => {
                            self.queue(call, completion);
                        }
                    }
                }
            }
        }
    }

    /// Socket open: flush the queue, then serve replies and calls.
    async fn connected(&mut self, ws: WsStream) -> Option<Phase> {
        let (mut ws_write, mut ws_read) = ws.split();

        self.set_state(ConnectionState::Connected);
        info!(url = %self.url, "Connected");

        self.notify_status(true);

        while let Some(frame) = self.session.next_outbound() {
            self.write(&mut ws_write, frame).await;
        }

        loop {
            tokio::select! {
                // Replies and notifications from the host
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => self.session.handle_incoming(&text),

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by host");
                            return Some(self.on_close());
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            return Some(self.on_close());
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            return Some(self.on_close());
                        }

                        // Ignore Binary, Ping, Pong
                        Some(Ok(_)) => {}
                    }
                }

                // Commands from client handles
                command = self.command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Dispatch { call, completion }) => {
                            if let Some(frame) = self.session.dispatch(call, completion) {
                                self.write(&mut ws_write, frame).await;
                            }
                        }

                        Some(ConnectionCommand::Connect) => debug!("Connect ignored, already connected"),

                        Some(ConnectionCommand::Disconnect) => {
                            debug!("Disconnect requested");
                            self.suppress_reconnect = true;
                            let _ = ws_write.close().await;
                            return Some(self.on_close());
                        }

                        None => {
                            debug!("Command channel closed");
                            let _ = ws_write.close().await;
                            return None;
                        }
                    }
                }
            }
        }
    }

    fn begin_connect(&mut self) -> Phase {
        self.suppress_reconnect = false;
        Phase::Connecting
    }

    /// Encodes a call and queues its frame until the socket opens.
    fn queue(&mut self, call: Call, completion: Completion) {
        if let Some(frame) = self.session.dispatch(call, completion) {
            trace!(id = %frame.id, text = %frame.text, "Frame queued");
            self.session.enqueue(frame);
        }
    }

    /// Writes one frame; a failure fails only the call that owns it.
    async fn write<S>(&mut self, ws_write: &mut S, frame: Frame)
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
    {
        let Frame { id, text } = frame;
        trace!(%id, %text, "Frame sent");

        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
            warn!(%id, error = %e, "Failed to write frame");
            self.session.fail(id, Error::connection(e.to_string()));
        }
    }

    /// Enters the disconnected state and picks the next phase.
    fn on_close(&mut self) -> Phase {
        self.set_state(ConnectionState::Disconnected);
        warn!(url = %self.url, "Disconnected");

        let retry = self.notify_status(false);

        let mut ended = std::mem::take(&mut self.session);
        ended.close();

        if self.suppress_reconnect {
            debug!("Reconnect suppressed by disconnect()");
            Phase::Idle
        } else if !retry {
            debug!("Reconnect declined by status callback");
            Phase::Idle
        } else {
            debug!(delay = ?self.reconnect_delay, "Reconnect scheduled");
            Phase::Waiting(Instant::now() + self.reconnect_delay)
        }
    }

    /// Runs the status callback; no callback means "keep reconnecting".
    ///
    /// A panicking callback is logged and counts as "keep reconnecting".
    fn notify_status(&mut self, connected: bool) -> bool {
        let Some(callback) = self.on_status.as_mut() else {
            return true;
        };

        panic::catch_unwind(AssertUnwindSafe(|| callback(connected))).unwrap_or_else(|_| {
            warn!(connected, "Status callback panicked");
            true
        })
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::oneshot;

    use crate::protocol::{Invocation, Value};

    fn config(port: u16, on_status: Option<StatusCallback>) -> ConnectionConfig {
        ConnectionConfig {
            endpoint: Endpoint::new("127.0.0.1", port),
            reconnect_delay: Duration::from_millis(50),
            on_status,
        }
    }

    fn dispatch(
        tx: &mpsc::UnboundedSender<ConnectionCommand>,
        invocation: Invocation,
    ) -> oneshot::Receiver<crate::error::Result<Option<Value>>> {
        let (completion, rx) = oneshot::channel();
        let call = Call::classify(invocation).expect("valid call");
        tx.send(ConnectionCommand::Dispatch { call, completion })
            .expect("task alive");
        rx
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_RECONNECT_DELAY.as_secs(), 3);
    }

    #[test]
    fn test_default_state() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_setter_completes_while_idle() {
        let state = Arc::new(Mutex::new(ConnectionState::Disconnected));
        let tx = ConnectionManager::spawn(config(1, None), Arc::clone(&state));

        let rx = dispatch(&tx, Invocation::new("set_track_mute").arg("t").arg(true));
        assert_eq!(rx.await.expect("completed").expect("ok"), None);
        assert_eq!(*state.lock(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_pending_call_fails_when_attempt_fails() {
        // Bind then drop a listener to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        let callback: StatusCallback = Box::new(move |connected| {
            let _ = status_tx.send(connected);
            false
        });

        let state = Arc::new(Mutex::new(ConnectionState::Disconnected));
        let tx = ConnectionManager::spawn(config(port, Some(callback)), Arc::clone(&state));

        let rx = dispatch(&tx, Invocation::new("get_tracks"));
        tx.send(ConnectionCommand::Connect).expect("task alive");

        assert!(matches!(rx.await.expect("completed"), Err(Error::ConnectionClosed)));
        assert_eq!(status_rx.recv().await, Some(false));
        assert_eq!(*state.lock(), ConnectionState::Disconnected);
    }

    fn manager(on_status: Option<StatusCallback>) -> ConnectionManager {
        let (_command_tx, command_rx) = mpsc::unbounded_channel();
        ConnectionManager {
            url: Endpoint::new("127.0.0.1", 1).ws_url(),
            reconnect_delay: Duration::from_millis(50),
            on_status,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            session: Session::new(),
            suppress_reconnect: false,
            command_rx,
        }
    }

    fn call(
        manager: &mut ConnectionManager,
        invocation: Invocation,
    ) -> (Frame, oneshot::Receiver<crate::error::Result<Option<Value>>>) {
        let (completion, rx) = oneshot::channel();
        let call = Call::classify(invocation).expect("valid call");
        let frame = manager.session.dispatch(call, completion).expect("frame");
        (frame, rx)
    }

    #[tokio::test]
    async fn test_write_failure_fails_only_its_call() {
        use tokio_tungstenite::tungstenite::Error as WsError;

        let mut manager = manager(None);
        let (first, mut first_rx) = call(&mut manager, Invocation::new("get_tracks"));
        let (second, mut second_rx) = call(&mut manager, Invocation::new("get_track_count"));

        let mut broken = Box::pin(futures_util::sink::unfold((), |(), _: Message| async {
            Err::<(), _>(WsError::ConnectionClosed)
        }));
        manager.write(&mut broken, first).await;

        match first_rx.try_recv().expect("completed") {
            Err(Error::Connection { .. }) => {}
            other => panic!("expected connection error, got {other:?}"),
        }
        assert!(second_rx.try_recv().is_err());
        assert_eq!(manager.session.pending(), 1);

        let mut healthy = futures_util::sink::drain();
        manager.write(&mut healthy, second).await;
        assert!(second_rx.try_recv().is_err());
        assert_eq!(manager.session.pending(), 1);
    }

    #[test]
    fn test_status_callback_panic_keeps_reconnecting() {
        let callback: StatusCallback = Box::new(|_: bool| -> bool { panic!("status callback failed") });
        let mut manager = manager(Some(callback));

        assert!(manager.notify_status(true));
        assert!(manager.notify_status(false));
    }

    #[tokio::test]
    async fn test_reconnect_delay_follows_config() {
        let mut manager = manager(None);
        let before = Instant::now();

        match manager.on_close() {
            Phase::Waiting(deadline) => {
                assert!(deadline >= before + Duration::from_millis(50));
            }
            _ => panic!("expected a scheduled reconnect"),
        }
    }
}
