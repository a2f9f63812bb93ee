//! Client handle.
//!
//! A [`Client`] is a cheap, cloneable handle to one connection task. Every
//! clone shares the same connection, session and subscriptions. The task
//! shuts down once the last clone is dropped.
//!
//! # Example
//!
//! ```no_run
//! use hostlink::{Client, Observer, Result, Value};
//!
//! # async fn example() -> Result<()> {
//! let client = Client::builder().host("127.0.0.1").build()?;
//! client.connect()?;
//!
//! // Queued until the socket is open, then answered by the host
//! let volume = client.invoke("get_track_volume", [Value::from("track-1")]).await?;
//!
//! let observer = Observer::new(|value| println!("mute: {value}"));
//! client.subscribe("track-1", "track_mute", observer.clone()).await?;
//! client.unsubscribe("track-1", "track_mute", &observer).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::TargetRef;
use crate::protocol::{Call, Invocation, Value};
use crate::session::Observer;
use crate::transport::{ConnectionCommand, ConnectionState, Endpoint};

use super::builder::ClientBuilder;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
pub(crate) struct ClientInner {
    /// Host this client talks to.
    pub endpoint: Endpoint,

    /// State published by the connection task.
    pub state: Arc<Mutex<ConnectionState>>,

    /// Command channel to the connection task.
    pub command_tx: mpsc::UnboundedSender<ConnectionCommand>,
}

// ============================================================================
// Client
// ============================================================================

/// Handle to a control host connection.
///
/// Calls may be issued in any state. While disconnected they are queued
/// and sent in order once the connection opens.
#[derive(Clone)]
pub struct Client {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

// ============================================================================
// Client - Display
// ============================================================================

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.inner.endpoint)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Lifecycle
// ============================================================================

impl Client {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Wraps a freshly spawned connection task.
    pub(crate) fn from_parts(
        endpoint: Endpoint,
        state: Arc<Mutex<ConnectionState>>,
        command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                endpoint,
                state,
                command_tx,
            }),
        }
    }

    /// Starts connecting to the host.
    ///
    /// Returns immediately; progress is reported through the status
    /// callback. Clears a previous [`disconnect`](Self::disconnect). Has no
    /// effect while an attempt is already in flight.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] if the connection is open
    /// - [`Error::ConnectionClosed`] if the connection task has stopped
    pub fn connect(&self) -> Result<()> {
        if self.state() == ConnectionState::Connected {
            return Err(Error::AlreadyConnected);
        }

        debug!(endpoint = %self.inner.endpoint.ws_url(), "Connect requested");
        self.send(ConnectionCommand::Connect)
    }

    /// Closes the connection and stops automatic reconnection.
    ///
    /// Pending calls fail with [`Error::ConnectionClosed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection task has stopped.
    pub fn disconnect(&self) -> Result<()> {
        self.send(ConnectionCommand::Disconnect)
    }

    fn send(&self, command: ConnectionCommand) -> Result<()> {
        self.inner
            .command_tx
            .send(command)
            .map_err(|_| Error::ConnectionClosed)
    }
}

// ============================================================================
// Client - Accessors
// ============================================================================

impl Client {
    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    /// Returns `true` if the connection is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns the host endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }
}

// ============================================================================
// Client - Calls
// ============================================================================

impl Client {
    /// Invokes a host operation by name.
    ///
    /// `set_*` operations complete with `None` as soon as they are handed
    /// to the connection task. Other operations wait for the host's reply.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`] if the host reports a failure
    /// - [`Error::ProtocolMisuse`] for listener operations (use
    ///   [`subscribe`](Self::subscribe) instead)
    /// - [`Error::ConnectionClosed`] if the session ends first
    pub async fn invoke(
        &self,
        operation: impl Into<String>,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<Option<Value>> {
        self.call(Invocation::new(operation).args(args)).await
    }

    /// Issues a prepared invocation.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke). Listener invocations additionally fail
    /// with [`Error::ProtocolMisuse`] unless they carry one target argument
    /// and an observer.
    pub async fn call(&self, invocation: Invocation) -> Result<Option<Value>> {
        let call = Call::classify(invocation)?;
        let fire_and_forget = call.is_fire_and_forget();

        let (completion, rx) = oneshot::channel();
        self.send(ConnectionCommand::Dispatch { call, completion })?;

        if fire_and_forget {
            return Ok(None);
        }

        rx.await?
    }

    /// Attaches an observer to a property of a remote entity.
    ///
    /// Sends `add_<property>_listener` for the first observer of a
    /// target/property pair. Later observers share that registration and
    /// complete without contacting the host.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`] if the host rejects the registration
    /// - [`Error::ConnectionClosed`] if the session ends first
    pub async fn subscribe(
        &self,
        target: impl Into<TargetRef>,
        property: &str,
        observer: Observer,
    ) -> Result<()> {
        let invocation = Invocation::new(format!("add_{property}_listener"))
            .arg(target.into())
            .observer(observer);

        self.call(invocation).await.map(|_| ())
    }

    /// Detaches an observer.
    ///
    /// Sends `remove_<property>_listener` only when the last observer of a
    /// target/property pair goes away. Unknown observers are ignored.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`] if the host rejects the removal
    /// - [`Error::ConnectionClosed`] if the session ends first
    pub async fn unsubscribe(
        &self,
        target: impl Into<TargetRef>,
        property: &str,
        observer: &Observer,
    ) -> Result<()> {
        let invocation = Invocation::new(format!("remove_{property}_listener"))
            .arg(target.into())
            .observer(observer.clone());

        self.call(invocation).await.map(|_| ())
    }
}

// ============================================================================
// Tests
// ============================================================================
