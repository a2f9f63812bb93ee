//! Wire protocol: values, frames and call classification.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Shape |
//! |---------|-----------|-------|
//! | Request | Local → Host | `[id, operation, ...args]` |
//! | Reply | Host → Local | `[id, result]` or `[id]` |
//! | Notification | Host → Local | `[subscription id, value]` |
//!
//! Notifications are replies that reuse the id of the frame that registered
//! the listener.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `call` | Invocation and call classification |
//! | `codec` | Frame encoding and reply decoding |
//! | `value` | Argument/result values with infinity escaping |

// ============================================================================
// Submodules
// ============================================================================

/// Invocation and call classification.
pub mod call;

/// Frame encoding and reply decoding.
pub mod codec;

/// Argument and result values.
pub mod value;

// ============================================================================
// Re-exports
// ============================================================================

pub use call::{Call, Invocation};
pub use codec::{ERROR_MARKER, Frame, Reply};
pub use value::Value;
