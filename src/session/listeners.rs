//! Listener registry.
//!
//! Maps many local observers onto a single host-side registration per
//! (target, property) key. Only the first subscribe and the last
//! unsubscribe for a key produce a frame.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::identifiers::{SequenceId, SubscriptionKey};
use crate::protocol::Value;

// ============================================================================
// Observer
// ============================================================================

/// Callback invoked with every change notification of a subscription.
///
/// Observers compare by identity: clones of one `Observer` are equal, two
/// observers built from identical closures are not. Keep a clone around to
/// unsubscribe later.
#[derive(Clone)]
pub struct Observer(Arc<dyn Fn(&Value) + Send + Sync>);

impl Observer {
    /// Wraps a callback.
    ///
    /// The callback runs on the connection task. Keep it short; a panic is
    /// caught and logged, except in builds with `panic = "abort"`.
    #[inline]
    pub fn new(callback: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    /// Invokes the callback.
    ///
    /// Returns `false` if the callback panicked.
    #[inline]
    pub fn notify(&self, value: &Value) -> bool {
        panic::catch_unwind(AssertUnwindSafe(|| (self.0)(value))).is_ok()
    }
}

impl PartialEq for Observer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Observer {}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Observer({:p})", Arc::as_ptr(&self.0))
    }
}

// ============================================================================
// Types
// ============================================================================

/// Outcome of [`ListenerRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscribed {
    /// Id owning the host-side registration.
    pub id: SequenceId,
    /// `true` if the host must be told about this subscription.
    pub needs_registration: bool,
}

/// Host registration shared by all observers of one key.
#[derive(Debug)]
struct SubscriptionRecord {
    key: SubscriptionKey,
    observers: Vec<Observer>,
}

// ============================================================================
// ListenerRegistry
// ============================================================================

/// Subscription records of one session.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    records: FxHashMap<SequenceId, SubscriptionRecord>,
    keys: FxHashMap<SubscriptionKey, SequenceId>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer for `key`.
    ///
    /// `allocate` is only called when the key has no record yet; the id it
    /// returns becomes the owner of the new registration.
    pub fn subscribe(
        &mut self,
        key: SubscriptionKey,
        observer: Observer,
        allocate: impl FnOnce() -> SequenceId,
    ) -> Subscribed {
        if let Some(&id) = self.keys.get(&key)
            && let Some(record) = self.records.get_mut(&id)
        {
            record.observers.push(observer);
            trace!(%id, key = %record.key, observers = record.observers.len(), "Observer added");

            return Subscribed {
                id,
                needs_registration: false,
            };
        }

        let id = allocate();
        trace!(%id, %key, "Subscription created");

        self.keys.insert(key.clone(), id);
        self.records.insert(
            id,
            SubscriptionRecord {
                key,
                observers: vec![observer],
            },
        );

        Subscribed {
            id,
            needs_registration: true,
        }
    }

    /// Removes an observer from `key`.
    ///
    /// Returns the owning id when the last observer is gone and the host
    /// registration must be dropped. Unknown keys and observers are ignored.
    pub fn unsubscribe(&mut self, key: &SubscriptionKey, observer: &Observer) -> Option<SequenceId> {
        let id = *self.keys.get(key)?;
        let record = self.records.get_mut(&id)?;

        record.observers.retain(|o| o != observer);

        if !record.observers.is_empty() {
            trace!(%id, %key, observers = record.observers.len(), "Observer removed");
            return None;
        }

        self.records.remove(&id);
        self.keys.remove(key);
        trace!(%id, %key, "Subscription dropped");

        Some(id)
    }

    /// Drops subscription `id` with all of its observers.
    ///
    /// Returns the number of observers removed.
    pub fn remove(&mut self, id: SequenceId) -> usize {
        let Some(record) = self.records.remove(&id) else {
            return 0;
        };

        self.keys.remove(&record.key);
        trace!(%id, key = %record.key, "Subscription removed");

        record.observers.len()
    }

    /// Delivers a notification to every observer of subscription `id`.
    ///
    /// Returns `false` if `id` is not a live subscription.
    pub fn dispatch(&self, id: SequenceId, value: &Value) -> bool {
        let Some(record) = self.records.get(&id) else {
            return false;
        };

        for observer in &record.observers {
            if !observer.notify(value) {
                warn!(%id, key = %record.key, "Observer panicked");
            }
        }

        true
    }

    /// Returns `true` if `id` owns a live subscription.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: SequenceId) -> bool {
        self.records.contains_key(&id)
    }

    /// Returns the number of observers registered under `key`.
    #[inline]
    #[must_use]
    pub fn observer_count(&self, key: &SubscriptionKey) -> usize {
        self.keys
            .get(key)
            .and_then(|id| self.records.get(id))
            .map_or(0, |record| record.observers.len())
    }

    /// Returns the number of live subscriptions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there are no subscriptions.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    use crate::identifiers::TargetRef;

    fn key(target: &str, property: &str) -> SubscriptionKey {
        SubscriptionKey::new(&TargetRef::from(target), property)
    }

    fn counter() -> impl FnMut() -> SequenceId {
        let mut next = 0;
        move || {
            let id = SequenceId::new(next);
            next += 1;
            id
        }
    }

    #[test]
    fn test_observer_identity() {
        let a = Observer::new(|_| {});
        let b = Observer::new(|_| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_first_subscribe_needs_registration() {
        let mut registry = ListenerRegistry::new();
        let mut allocate = counter();

        let first = registry.subscribe(key("t", "mute"), Observer::new(|_| {}), &mut allocate);
        assert!(first.needs_registration);
        assert_eq!(first.id, SequenceId::new(0));

        let second = registry.subscribe(key("t", "mute"), Observer::new(|_| {}), &mut allocate);
        assert!(!second.needs_registration);
        assert_eq!(second.id, first.id);
        assert_eq!(registry.observer_count(&key("t", "mute")), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_subscribe_does_not_allocate() {
        let mut registry = ListenerRegistry::new();
        registry.subscribe(key("t", "mute"), Observer::new(|_| {}), || SequenceId::new(4));
        registry.subscribe(key("t", "mute"), Observer::new(|_| {}), || {
            panic!("must not allocate for an existing key")
        });
    }

    #[test]
    fn test_distinct_keys_get_distinct_ids() {
        let mut registry = ListenerRegistry::new();
        let mut allocate = counter();

        let mute = registry.subscribe(key("t", "mute"), Observer::new(|_| {}), &mut allocate);
        let volume = registry.subscribe(key("t", "volume"), Observer::new(|_| {}), &mut allocate);
        assert_ne!(mute.id, volume.id);
        assert!(volume.needs_registration);
    }

    #[test]
    fn test_unsubscribe_last_returns_id() {
        let mut registry = ListenerRegistry::new();
        let a = Observer::new(|_| {});
        let b = Observer::new(|_| {});

        let id = registry.subscribe(key("t", "mute"), a.clone(), || SequenceId::new(3)).id;
        registry.subscribe(key("t", "mute"), b.clone(), || SequenceId::new(99));

        assert_eq!(registry.unsubscribe(&key("t", "mute"), &a), None);
        assert_eq!(registry.unsubscribe(&key("t", "mute"), &b), Some(id));
        assert!(registry.is_empty());
        assert!(!registry.contains(id));
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let mut registry = ListenerRegistry::new();
        let a = Observer::new(|_| {});
        let stranger = Observer::new(|_| {});

        assert_eq!(registry.unsubscribe(&key("t", "mute"), &a), None);

        registry.subscribe(key("t", "mute"), a.clone(), || SequenceId::new(0));
        assert_eq!(registry.unsubscribe(&key("t", "mute"), &stranger), None);
        assert_eq!(registry.observer_count(&key("t", "mute")), 1);

        assert_eq!(registry.unsubscribe(&key("t", "mute"), &a), Some(SequenceId::new(0)));
        assert_eq!(registry.unsubscribe(&key("t", "mute"), &a), None);
    }

    #[test]
    fn test_subscribe_after_drop_reregisters() {
        let mut registry = ListenerRegistry::new();
        let a = Observer::new(|_| {});

        registry.subscribe(key("t", "mute"), a.clone(), || SequenceId::new(0));
        registry.unsubscribe(&key("t", "mute"), &a);

        let again = registry.subscribe(key("t", "mute"), a, || SequenceId::new(5));
        assert!(again.needs_registration);
        assert_eq!(again.id, SequenceId::new(5));
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();

        for name in ["a", "b", "c"] {
            let seen = std::sync::Arc::clone(&seen);
            registry.subscribe(
                key("t", "mute"),
                Observer::new(move |value| seen.lock().push((name, value.clone()))),
                || SequenceId::new(1),
            );
        }

        assert!(registry.dispatch(SequenceId::new(1), &Value::Bool(true)));
        assert_eq!(
            *seen.lock(),
            vec![
                ("a", Value::Bool(true)),
                ("b", Value::Bool(true)),
                ("c", Value::Bool(true))
            ]
        );
    }

    #[test]
    fn test_dispatch_unknown_id() {
        let registry = ListenerRegistry::new();
        assert!(!registry.dispatch(SequenceId::new(0), &Value::Null));
    }

    #[test]
    fn test_remove_drops_record_and_key() {
        let mut registry = ListenerRegistry::new();
        registry.subscribe(key("t", "mute"), Observer::new(|_| {}), || SequenceId::new(0));
        registry.subscribe(key("t", "mute"), Observer::new(|_| {}), || SequenceId::new(9));

        assert_eq!(registry.remove(SequenceId::new(0)), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.observer_count(&key("t", "mute")), 0);
        assert_eq!(registry.remove(SequenceId::new(0)), 0);

        let again = registry.subscribe(key("t", "mute"), Observer::new(|_| {}), || SequenceId::new(3));
        assert!(again.needs_registration);
    }

    #[test]
    fn test_panicking_observer_does_not_stop_dispatch() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        let mut registry = ListenerRegistry::new();

        registry.subscribe(
            key("t", "mute"),
            Observer::new(|_| panic!("observer failure")),
            || SequenceId::new(0),
        );
        registry.subscribe(
            key("t", "mute"),
            Observer::new(move |value| sink.lock().push(value.clone())),
            || SequenceId::new(1),
        );

        assert!(registry.dispatch(SequenceId::new(0), &Value::Bool(false)));
        assert_eq!(*seen.lock(), vec![Value::Bool(false)]);
    }
}
