//! WebSocket transport layer.
//!
//! One WebSocket connection from this client to the control host carries
//! every call, reply and change notification.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Client (Rust)  │                              │  Control host   │
//! │                 │         WebSocket            │  (inside DAW)   │
//! │  Connection     │─────────────────────────────►│                 │
//! │  Manager        │◄─────────────────────────────│  WebSocket      │
//! │                 │     host:49152 (default)     │  Server         │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection state machine and event loop |
//! | `endpoint` | Host address resolution |

// ============================================================================
// Submodules
// ============================================================================

/// Connection state machine and event loop.
pub mod connection;

/// Host address resolution.
pub mod endpoint;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{ConnectionState, DEFAULT_RECONNECT_DELAY, StatusCallback};
pub use endpoint::{DEFAULT_PORT, Endpoint};

pub(crate) use connection::{ConnectionCommand, ConnectionConfig, ConnectionManager};
