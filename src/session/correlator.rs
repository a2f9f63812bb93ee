//! Request/reply correlation.
//!
//! Allocates sequence ids and tracks calls waiting for a reply. Each
//! pending entry is completed exactly once: by its reply, by a failed
//! write, or by session teardown.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::SequenceId;
use crate::protocol::{Reply, Value};

// ============================================================================
// Types
// ============================================================================

/// Channel completing one caller.
pub type Completion = oneshot::Sender<Result<Option<Value>>>;

// ============================================================================
// Correlator
// ============================================================================

/// Sequence id allocator and pending-call map of one session.
#[derive(Debug, Default)]
pub struct Correlator {
    next_id: SequenceId,
    pending: FxHashMap<SequenceId, Completion>,
}

impl Correlator {
    /// Creates a correlator starting at id 0.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next sequence id.
    #[inline]
    pub fn allocate(&mut self) -> SequenceId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }

    /// Records a call waiting for the reply tagged `id`.
    pub fn register(&mut self, id: SequenceId, completion: Completion) {
        if self.pending.insert(id, completion).is_some() {
            debug!(%id, "Replaced pending call with reused id");
        }
    }

    /// Removes and returns the pending entry for `id`.
    #[inline]
    pub fn consume(&mut self, id: SequenceId) -> Option<Completion> {
        self.pending.remove(&id)
    }

    /// Completes the call a reply belongs to.
    ///
    /// Returns `false` if no call is waiting for `reply.id`.
    pub fn resolve(&mut self, reply: Reply) -> bool {
        let Some(completion) = self.consume(reply.id) else {
            return false;
        };

        let id = reply.id;
        let outcome = reply.into_outcome();

        match &outcome {
            Ok(result) => trace!(%id, ?result, "Call resolved"),
            Err(e) => debug!(%id, error = %e, "Call failed on host"),
        }

        // The caller may have stopped waiting.
        let _ = completion.send(outcome);
        true
    }

    /// Fails the call waiting for `id`, if any.
    pub fn fail(&mut self, id: SequenceId, error: Error) {
        if let Some(completion) = self.consume(id) {
            let _ = completion.send(Err(error));
        }
    }

    /// Fails every pending call with [`Error::ConnectionClosed`].
    pub fn close(&mut self) {
        let pending: Vec<_> = self.pending.drain().collect();
        let count = pending.len();

        for (_, completion) in pending {
            let _ = completion.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending calls on session teardown");
        }
    }

    /// Returns `true` if a call is waiting for `id`.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, id: SequenceId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Returns the number of pending calls.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::oneshot::error::TryRecvError;

    fn reply(id: u64, result: Option<Value>) -> Reply {
        Reply {
            id: SequenceId::new(id),
            result,
        }
    }

    #[test]
    fn test_allocate_is_gapless() {
        let mut correlator = Correlator::new();
        let ids: Vec<u64> = (0..5).map(|_| correlator.allocate().as_u64()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_resolve_completes_once() {
        let mut correlator = Correlator::new();
        let id = correlator.allocate();
        let (tx, mut rx) = oneshot::channel();
        correlator.register(id, tx);

        assert!(correlator.resolve(reply(0, Some(Value::Float(-3.5)))));
        assert_eq!(rx.try_recv().expect("completed").expect("ok"), Some(Value::Float(-3.5)));

        assert!(!correlator.resolve(reply(0, Some(Value::Float(1.0)))));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[test]
    fn test_resolve_void_ack() {
        let mut correlator = Correlator::new();
        let (tx, mut rx) = oneshot::channel();
        let id = correlator.allocate();
        correlator.register(id, tx);

        assert!(correlator.resolve(reply(0, None)));
        assert_eq!(rx.try_recv().expect("completed").expect("ok"), None);
    }

    #[test]
    fn test_resolve_remote_error() {
        let mut correlator = Correlator::new();
        let (tx, mut rx) = oneshot::channel();
        let id = correlator.allocate();
        correlator.register(id, tx);

        correlator.resolve(reply(0, Some(Value::from("error:disk full"))));

        let err = rx.try_recv().expect("completed").unwrap_err();
        assert!(err.is_remote());
        assert_eq!(err.remote_message(), Some("disk full"));
    }

    #[test]
    fn test_resolve_orphan() {
        let mut correlator = Correlator::new();
        assert!(!correlator.resolve(reply(17, Some(Value::Null))));
    }

    #[test]
    fn test_fail_only_affects_one_call() {
        let mut correlator = Correlator::new();
        let (tx_a, mut rx_a) = oneshot::channel();
        let (tx_b, mut rx_b) = oneshot::channel();
        let a = correlator.allocate();
        let b = correlator.allocate();
        correlator.register(a, tx_a);
        correlator.register(b, tx_b);

        correlator.fail(a, Error::connection("write failed"));

        assert!(matches!(
            rx_a.try_recv().expect("completed"),
            Err(Error::Connection { .. })
        ));
        assert!(matches!(rx_b.try_recv(), Err(TryRecvError::Empty)));
        assert!(correlator.is_pending(b));
        assert!(!correlator.is_pending(a));
    }

    #[test]
    fn test_close_fails_everything() {
        let mut correlator = Correlator::new();
        let (tx, mut rx) = oneshot::channel();
        let id = correlator.allocate();
        correlator.register(id, tx);

        correlator.close();

        assert!(matches!(
            rx.try_recv().expect("completed"),
            Err(Error::ConnectionClosed)
        ));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[test]
    fn test_resolve_after_caller_gave_up() {
        let mut correlator = Correlator::new();
        let (tx, rx) = oneshot::channel();
        let id = correlator.allocate();
        correlator.register(id, tx);
        drop(rx);

        assert!(correlator.resolve(reply(0, Some(Value::Bool(true)))));
    }
}
