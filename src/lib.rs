//! hostlink - Remote control client for DAW control hosts.
//!
//! This library lets a program drive a digital audio workstation through a
//! control host that runs inside the DAW and exposes its tracks, plugins
//! and parameters over a WebSocket.
//!
//! # Architecture
//!
//! The client follows a request/reply model over a single connection:
//!
//! - **Local End (Rust)**: Issues calls, receives replies and change notifications
//! - **Remote End (Control host)**: Executes calls inside the DAW, pushes changes
//!
//! Key design principles:
//!
//! - One connection task per [`Client`] owns the socket and all session state
//! - Frames are JSON arrays: `[id, operation, ...args]` out, `[id, result]` in
//! - Many local observers share one host-side listener per target/property
//! - Calls issued while disconnected are queued and sent on connect
//!
//! # Quick Start
//!
//! ```no_run
//! use hostlink::{Client, Host, Observer, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .host("192.168.1.20")
//!         .on_status(|connected| {
//!             println!("connected: {connected}");
//!             true
//!         })
//!         .build()?;
//!
//!     client.connect()?;
//!
//!     let host = Host::new(client);
//!     let track = host.get_track_by_name("Vocals").await?;
//!     println!("volume: {} dB", host.get_track_volume(&track).await?);
//!
//!     let observer = Observer::new(|value| println!("mute: {value}"));
//!     host.add_track_mute_listener(&track, observer).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], [`ClientBuilder`] and typed [`Host`] bindings |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire values, frame codec and call classification |
//! | [`session`] | Per-connection correlation and listener state |
//! | [`transport`] | WebSocket connection management |

// ============================================================================
// Modules
// ============================================================================

/// Client handles and typed host bindings.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for calls, remote entities and subscriptions.
pub mod identifiers;

/// Wire values, frame codec and call classification.
pub mod protocol;

/// Per-connection session state.
///
/// Internal module; owned by the connection task.
pub mod session;

/// WebSocket transport layer.
///
/// Internal module handling the connection lifecycle.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, Host, TrackType};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{SequenceId, SubscriptionKey, TargetRef};

// Protocol types
pub use protocol::{Invocation, Value};

// Session types
pub use session::Observer;

// Transport types
pub use transport::{
    ConnectionState, DEFAULT_PORT, DEFAULT_RECONNECT_DELAY, Endpoint, StatusCallback,
};
