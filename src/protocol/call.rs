//! Call classification.
//!
//! Every invocation is classified once, by operation name, into a [`Call`]:
//!
//! | Pattern | Variant | Reply awaited |
//! |---------|---------|---------------|
//! | `add_<property>_listener` | [`Call::Subscribe`] | registration ack, first observer only |
//! | `remove_<property>_listener` | [`Call::Unsubscribe`] | unregister ack, last observer only |
//! | `set_<property>` | [`Call::FireAndForget`] | no |
//! | anything else | [`Call::Plain`] | yes |

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::identifiers::TargetRef;
use crate::session::Observer;

use super::Value;

// ============================================================================
// Patterns
// ============================================================================

static LISTENER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(add|remove)_([a-z_]+)_listener$").expect("valid listener pattern")
});

static SETTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^set_[a-z_]+$").expect("valid setter pattern"));

// ============================================================================
// Invocation
// ============================================================================

/// An unclassified remote call as issued by the caller.
///
/// # Example
///
/// ```ignore
/// let invocation = Invocation::new("add_track_mute_listener")
///     .arg("track-1")
///     .observer(Observer::new(|muted| println!("{muted}")));
/// ```
#[derive(Clone)]
pub struct Invocation {
    operation: String,
    args: Vec<Value>,
    observer: Option<Observer>,
}

impl Invocation {
    /// Creates an invocation without arguments.
    #[inline]
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            args: Vec::new(),
            observer: None,
        }
    }

    /// Appends one argument.
    #[inline]
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Appends several arguments.
    #[inline]
    #[must_use]
    pub fn args(mut self, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Attaches the observer of a listener call.
    #[inline]
    #[must_use]
    pub fn observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the operation name.
    #[inline]
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("operation", &self.operation)
            .field("args", &self.args)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

// ============================================================================
// Call
// ============================================================================

/// A classified call.
#[derive(Debug, Clone)]
pub enum Call {
    /// Request with a reply the caller waits for.
    Plain {
        /// Operation name.
        operation: String,
        /// Arguments.
        args: Vec<Value>,
    },

    /// Setter; the caller does not wait for the host.
    FireAndForget {
        /// Operation name.
        operation: String,
        /// Arguments.
        args: Vec<Value>,
    },

    /// Attach an observer to a target property.
    Subscribe {
        /// Operation name (`add_<property>_listener`).
        operation: String,
        /// Observed entity.
        target: TargetRef,
        /// Observed property.
        property: String,
        /// Callback for change notifications.
        observer: Observer,
    },

    /// Detach an observer from a target property.
    Unsubscribe {
        /// Operation name (`remove_<property>_listener`).
        operation: String,
        /// Observed entity.
        target: TargetRef,
        /// Observed property.
        property: String,
        /// Callback to remove.
        observer: Observer,
    },
}

impl Call {
    /// Classifies an invocation by its operation name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolMisuse`] if a listener operation does not
    /// carry exactly one target argument and an observer, or if an observer
    /// is attached to any other operation.
    pub fn classify(invocation: Invocation) -> Result<Self> {
        let Invocation {
            operation,
            mut args,
            observer,
        } = invocation;

        if let Some(captures) = LISTENER_PATTERN.captures(&operation) {
            let subscribe = &captures[1] == "add";
            let property = captures[2].to_string();

            let Some(observer) = observer else {
                return Err(Error::protocol_misuse(format!(
                    "{operation} requires an observer"
                )));
            };

            if args.len() != 1 {
                return Err(Error::protocol_misuse(format!(
                    "{operation} takes exactly one target, got {} arguments",
                    args.len()
                )));
            }

            let target = args
                .pop()
                .map(|value| TargetRef::from_value(&value))
                .transpose()
                .map_err(|e| Error::protocol_misuse(format!("{operation}: {e}")))?
                .ok_or_else(|| Error::protocol_misuse(format!("{operation} requires a target")))?;

            return Ok(if subscribe {
                Self::Subscribe {
                    operation,
                    target,
                    property,
                    observer,
                }
            } else {
                Self::Unsubscribe {
                    operation,
                    target,
                    property,
                    observer,
                }
            });
        }

        if observer.is_some() {
            return Err(Error::protocol_misuse(format!(
                "{operation} is not a listener operation and takes no observer"
            )));
        }

        if SETTER_PATTERN.is_match(&operation) {
            Ok(Self::FireAndForget { operation, args })
        } else {
            Ok(Self::Plain { operation, args })
        }
    }

    /// Returns the operation name.
    #[inline]
    #[must_use]
    pub fn operation(&self) -> &str {
        match self {
            Self::Plain { operation, .. }
            | Self::FireAndForget { operation, .. }
            | Self::Subscribe { operation, .. }
            | Self::Unsubscribe { operation, .. } => operation,
        }
    }

    /// Returns `true` if the caller completes without a reply.
    #[inline]
    #[must_use]
    pub fn is_fire_and_forget(&self) -> bool {
        matches!(self, Self::FireAndForget { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
