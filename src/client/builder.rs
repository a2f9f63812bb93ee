//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use hostlink::Client;
//!
//! # async fn example() -> hostlink::Result<()> {
//! let client = Client::builder()
//!     .host("192.168.1.20")
//!     .port(50000)
//!     .reconnect_delay(Duration::from_secs(5))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::error::{Error, Result};
use crate::transport::{
    ConnectionConfig, ConnectionManager, ConnectionState, DEFAULT_RECONNECT_DELAY, Endpoint,
    StatusCallback,
};

use super::core::Client;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
///
/// The endpoint is resolved in this order: [`endpoint`](Self::endpoint),
/// then [`page_url`](Self::page_url), then `127.0.0.1:49152`. A
/// [`host`](Self::host) or [`port`](Self::port) set on top overrides that
/// part of the resolved endpoint.
pub struct ClientBuilder {
    /// Explicit endpoint.
    endpoint: Option<Endpoint>,
    /// URL of the page served by the control host.
    page_url: Option<String>,
    /// Host override.
    host: Option<String>,
    /// Port override.
    port: Option<u16>,
    /// Delay before reconnecting.
    reconnect_delay: Duration,
    /// Connection status callback.
    on_status: Option<StatusCallback>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            page_url: None,
            host: None,
            port: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            on_status: None,
        }
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("page_url", &self.page_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("on_status", &self.on_status.is_some())
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder targeting `127.0.0.1:49152`.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint directly.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Derives the endpoint from the URL of a page served by the host.
    ///
    /// # Arguments
    ///
    /// * `url` - Page URL, e.g. `http://studio.local:8080/?port=50000`
    #[inline]
    #[must_use]
    pub fn page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    /// Sets the host name or IP address.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the WebSocket port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the wait between a disconnect and the next attempt.
    ///
    /// Defaults to 3 seconds.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the connection status callback.
    ///
    /// Called with `true` on connect and `false` on disconnect. Returning
    /// `false` from a disconnect notification stops reconnection.
    ///
    /// The callback runs on the connection task, so it should return
    /// quickly. A panic is caught, logged and treated as `true`, except in
    /// builds with `panic = "abort"`.
    #[inline]
    #[must_use]
    pub fn on_status(mut self, callback: impl FnMut(bool) -> bool + Send + 'static) -> Self {
        self.on_status = Some(Box::new(callback));
        self
    }

    /// Builds the client and spawns its connection task.
    ///
    /// The client starts disconnected; call [`Client::connect`] to open the
    /// connection. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the host is empty, the reconnect delay is zero
    ///   or no Tokio runtime is running
    /// - [`Error::Url`] or [`Error::InvalidArgument`] if the page URL is invalid
    pub fn build(self) -> Result<Client> {
        let endpoint = self.resolve_endpoint()?;
        self.validate_reconnect_delay()?;

        if Handle::try_current().is_err() {
            return Err(Error::config(
                "Client::build() must be called within a Tokio runtime",
            ));
        }

        let state = Arc::new(Mutex::new(ConnectionState::Disconnected));
        let command_tx = ConnectionManager::spawn(
            ConnectionConfig {
                endpoint: endpoint.clone(),
                reconnect_delay: self.reconnect_delay,
                on_status: self.on_status,
            },
            Arc::clone(&state),
        );

        Ok(Client::from_parts(endpoint, state, command_tx))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Resolves and validates the endpoint.
    fn resolve_endpoint(&self) -> Result<Endpoint> {
        let mut endpoint = match (&self.endpoint, &self.page_url) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(url)) => Endpoint::from_page_url(url)?,
            (None, None) => Endpoint::localhost(),
        };

        if let Some(host) = &self.host {
            endpoint.host.clone_from(host);
        }

        if let Some(port) = self.port {
            endpoint.port = port;
        }

        if endpoint.host.trim().is_empty() {
            return Err(Error::config(
                "Host must not be empty. Use .host() to set it.\n\
                 Example: Client::builder().host(\"127.0.0.1\")",
            ));
        }

        Ok(endpoint)
    }

    /// Validates the reconnect delay.
    fn validate_reconnect_delay(&self) -> Result<()> {
        if self.reconnect_delay.is_zero() {
            return Err(Error::config(
                "Reconnect delay must be greater than zero.\n\
                 Example: Client::builder().reconnect_delay(Duration::from_secs(3))",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
