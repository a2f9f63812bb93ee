//! Type-safe identifiers for calls, remote entities and subscriptions.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Wraps | Scope |
//! |------|-------|-------|
//! | [`SequenceId`] | `u64` | One connection session |
//! | [`TargetRef`] | string or integer | Opaque host handle |
//! | [`SubscriptionKey`] | `String` | Target + property pair |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::Value;

// ============================================================================
// SequenceId
// ============================================================================

/// Per-session call identifier.
///
/// Allocated from 0 upwards, one per outbound frame. The host echoes it in
/// replies and in change notifications of the subscription it registered.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SequenceId(u64);

impl SequenceId {
    /// Creates a sequence ID from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the following ID.
    #[inline]
    #[must_use]
    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SequenceId> for Value {
    fn from(id: SequenceId) -> Self {
        // Ids never get near i64::MAX within one session.
        Value::Integer(id.0 as i64)
    }
}

// ============================================================================
// TargetRef
// ============================================================================

/// Opaque reference to a remote track, plugin or parameter.
///
/// The host hands these out (e.g. from `get_tracks`) and expects them back
/// verbatim as the first argument of entity operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetRef {
    /// String handle.
    Handle(String),
    /// Integer handle.
    Index(i64),
}

impl TargetRef {
    /// Converts a host value into a reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the value is neither a string nor an integer.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::Handle(s.clone())),
            Value::Integer(i) => Ok(Self::Index(*i)),
            other => Err(Error::protocol(format!(
                "expected a target reference, got {other}"
            ))),
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handle(handle) => f.write_str(handle),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for TargetRef {
    fn from(handle: &str) -> Self {
        Self::Handle(handle.to_string())
    }
}

impl From<String> for TargetRef {
    fn from(handle: String) -> Self {
        Self::Handle(handle)
    }
}

impl From<i64> for TargetRef {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<u32> for TargetRef {
    fn from(index: u32) -> Self {
        Self::Index(i64::from(index))
    }
}

impl From<TargetRef> for Value {
    fn from(target: TargetRef) -> Self {
        match target {
            TargetRef::Handle(handle) => Value::String(handle),
            TargetRef::Index(index) => Value::Integer(index),
        }
    }
}

impl From<&TargetRef> for Value {
    fn from(target: &TargetRef) -> Self {
        target.clone().into()
    }
}

// ============================================================================
// SubscriptionKey
// ============================================================================

/// Deduplication key for listener registrations: `"{target}_{property}"`.
///
/// Targets containing `_` followed by a property suffix can collide with
/// another pair; handles issued by the host do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    /// Derives the key for a target/property pair.
    #[inline]
    #[must_use]
    pub fn new(target: &TargetRef, property: &str) -> Self {
        Self(format!("{target}_{property}"))
    }

    /// Returns the key text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
