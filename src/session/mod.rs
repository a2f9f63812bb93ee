//! Per-connection session state.
//!
//! A [`Session`] bundles everything that only makes sense for one
//! connection attempt: the sequence counter and pending calls
//! ([`Correlator`]), the subscription records ([`ListenerRegistry`]) and
//! the frames waiting for the socket. The connection task owns exactly one
//! session at a time and replaces it wholesale when the connection drops.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `correlator` | Sequence ids and pending calls |
//! | `listeners` | Observer deduplication per target/property |

// ============================================================================
// Submodules
// ============================================================================

/// Sequence ids and pending calls.
pub mod correlator;

/// Observer deduplication per target/property.
pub mod listeners;

// ============================================================================
// Re-exports
// ============================================================================

pub use correlator::{Completion, Correlator};
pub use listeners::{ListenerRegistry, Observer, Subscribed};

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::identifiers::{SequenceId, SubscriptionKey};
use crate::protocol::{Call, Frame, Reply, Value};

// ============================================================================
// Session
// ============================================================================

/// State of one connection session.
#[derive(Debug, Default)]
pub struct Session {
    correlator: Correlator,
    listeners: ListenerRegistry,
    outbound: VecDeque<Frame>,
}

impl Session {
    /// Creates an empty session; ids start at 0.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes a classified call.
    ///
    /// Returns the frame to send, or `None` when the call was satisfied
    /// locally (a duplicate subscribe, or an unsubscribe that leaves
    /// observers behind). Calls that do not wait for the host are completed
    /// before returning.
    pub fn dispatch(&mut self, call: Call, completion: Completion) -> Option<Frame> {
        match call {
            Call::Plain { operation, args } => {
                let id = self.correlator.allocate();
                self.correlator.register(id, completion);
                Some(Frame::encode(id, &operation, &args))
            }

            Call::FireAndForget { operation, args } => {
                let id = self.correlator.allocate();
                let _ = completion.send(Ok(None));
                Some(Frame::encode(id, &operation, &args))
            }

            Call::Subscribe {
                operation,
                target,
                property,
                observer,
            } => {
                let key = SubscriptionKey::new(&target, &property);
                let correlator = &mut self.correlator;
                let subscribed = self
                    .listeners
                    .subscribe(key, observer, || correlator.allocate());

                if !subscribed.needs_registration {
                    let _ = completion.send(Ok(None));
                    return None;
                }

                self.correlator.register(subscribed.id, completion);
                Some(Frame::encode(subscribed.id, &operation, &[Value::from(target)]))
            }

            Call::Unsubscribe {
                operation,
                target,
                property,
                observer,
            } => {
                let key = SubscriptionKey::new(&target, &property);

                let Some(owner) = self.listeners.unsubscribe(&key, &observer) else {
                    let _ = completion.send(Ok(None));
                    return None;
                };

                let id = self.correlator.allocate();
                self.correlator.register(id, completion);
                Some(Frame::encode(id, &operation, &[Value::from(owner)]))
            }
        }
    }

    /// Handles one inbound text frame.
    ///
    /// Notifications go to the subscription's observers; replies complete
    /// their pending call. Anything else is logged and dropped.
    pub fn handle_incoming(&mut self, text: &str) {
        let reply = match Reply::decode(text) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, text = %text, "Failed to decode reply");
                return;
            }
        };

        let id = reply.id;
        let subscription = self.listeners.contains(id);

        // While the registration call is pending, an error reply rejects
        // the registration instead of notifying.
        if subscription && reply.is_error() && self.correlator.is_pending(id) {
            self.drop_registration(id);
        } else if subscription && let Some(value) = &reply.result {
            // A bare ack on a subscription id is the registration reply.
            trace!(%id, %value, "Notification");
            self.listeners.dispatch(id, value);
        }

        if !self.correlator.resolve(reply) && !subscription {
            warn!(%id, "Reply for unknown call");
        }
    }

    /// Appends a frame to the outbound queue.
    #[inline]
    pub fn enqueue(&mut self, frame: Frame) {
        self.outbound.push_back(frame);
    }

    /// Takes the oldest queued frame.
    #[inline]
    pub fn next_outbound(&mut self) -> Option<Frame> {
        self.outbound.pop_front()
    }

    /// Fails the call waiting for `id` after its frame could not be written.
    ///
    /// A failed registration frame also drops its subscription, so the next
    /// subscriber for that key registers again.
    pub fn fail(&mut self, id: SequenceId, error: Error) {
        if self.correlator.is_pending(id) && self.listeners.contains(id) {
            self.drop_registration(id);
        }

        self.correlator.fail(id, error);
    }

    /// Forgets a subscription whose registration the host never accepted.
    fn drop_registration(&mut self, id: SequenceId) {
        let observers = self.listeners.remove(id);
        debug!(%id, observers, "Registration failed, subscription dropped");
    }

    /// Ends the session: fails pending calls, drops queued frames and
    /// subscriptions.
    pub fn close(&mut self) {
        let queued = self.outbound.len();
        let subscriptions = self.listeners.len();

        self.correlator.close();
        self.outbound.clear();
        self.listeners = ListenerRegistry::new();

        if queued > 0 || subscriptions > 0 {
            debug!(queued, subscriptions, "Session state discarded");
        }
    }

    /// Returns the number of frames waiting to be sent.
    #[inline]
    #[must_use]
    pub fn queued(&self) -> usize {
        self.outbound.len()
    }

    /// Returns the number of calls waiting for a reply.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.correlator.pending_count()
    }

    /// Returns the number of live subscriptions.
    #[inline]
    #[must_use]
    pub fn subscriptions(&self) -> usize {
        self.listeners.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
