//! Query-execution signal supplied by the surrounding test infrastructure.
//!
//! The database layer itself is an external collaborator: whatever ORM or
//! driver the project under test uses is expected to call
//! [`QuerySignal::notify`] from its statement logging hook. This module only
//! fans those events out to the observers that are subscribed while a test
//! is running.

use crate::types::QueryEvent;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::debug;

/// Receives query events while subscribed to a [`QuerySignal`].
///
/// Counting is best-effort: implementations must absorb their own failures
/// and must not panic.
pub trait QueryObserver: Send + Sync {
    fn observe(&self, event: &QueryEvent);
}

#[derive(Default)]
struct SignalInner {
    next_id: u64,
    observers: HashMap<u64, Arc<dyn QueryObserver>>,
}

/// Fan-out hub for query events.
///
/// Cloning is cheap and clones share the same subscriber set, so the same
/// signal can be handed both to the database layer (which notifies) and to
/// the reporting plugin (which subscribes).
#[derive(Clone, Default)]
pub struct QuerySignal {
    inner: Arc<Mutex<SignalInner>>,
}

impl QuerySignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer and returns a guard that unsubscribes it when
    /// dropped, bounding the observation window to the guard's lifetime.
    pub fn subscribe(&self, observer: Arc<dyn QueryObserver>) -> Subscription {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.observers.insert(id, observer);
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers one query event to every current subscriber.
    ///
    /// With no subscribers this is a no-op: queries issued outside any
    /// test's window are intentionally not counted.
    pub fn notify(&self, event: &QueryEvent) {
        let inner = self.lock();
        if inner.observers.is_empty() {
            debug!(connection = %event.connection, "query event outside any observation window");
            return;
        }
        for observer in inner.observers.values() {
            observer.observe(event);
        }
    }

    /// Number of currently subscribed observers.
    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SignalInner> {
        // A poisoned lock only means an observer panicked mid-notify; the
        // subscriber map itself is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// RAII guard for one [`QuerySignal`] subscription.
#[must_use = "dropping the subscription unsubscribes the observer"]
pub struct Subscription {
    id: u64,
    inner: Weak<Mutex<SignalInner>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.observers.remove(&self.id);
        }
    }
}
