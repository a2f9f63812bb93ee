//! Client handles.
//!
//! This module provides the entry point for talking to a control host.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Cloneable handle issuing calls and subscriptions |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`Host`] | Typed bindings for the host's named operations |
//! | [`TrackType`] | Kind of a track |
//!
//! # Example
//!
//! ```no_run
//! use hostlink::{Client, Host, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = Client::builder()
//!     .page_url("http://192.168.1.20:8080/?port=49152")
//!     .on_status(|connected| {
//!         println!("connected: {connected}");
//!         true
//!     })
//!     .build()?;
//!
//! client.connect()?;
//!
//! let host = Host::new(client);
//! for track in host.get_tracks().await? {
//!     println!("{}", host.get_track_name(&track).await?);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Typed bindings for the host's named operations.
pub mod host;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::Client;
pub use host::{Host, TrackType};
