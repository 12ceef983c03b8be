//! Subscriber Registry - in-process pub-sub for significant location changes.
//!
//! Callbacks are invoked synchronously, in registration order, on the task
//! that accepted the change. A panicking callback is caught and logged; the
//! remaining subscribers are still notified.
//!
//! Unsubscribing is idempotent and may happen from inside a callback: the
//! registry lock is never held while callbacks run.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use thiserror::Error;

use super::state::LocationChangeEvent;

/// Callback invoked on every significant change.
pub type LocationCallback = Arc<dyn Fn(&LocationChangeEvent) + Send + Sync>;

/// Identity of a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

/// A subscriber callback that panicked during notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{subscriber} failed: {message}")]
pub struct SubscriberCallbackError {
    pub subscriber: SubscriberId,
    pub message: String,
}

/// Outcome of one notification round.
#[derive(Debug, Default)]
pub struct NotifyReport {
    /// Callbacks that returned normally.
    pub delivered: usize,
    /// Callbacks that panicked.
    pub failures: Vec<SubscriberCallbackError>,
}

#[derive(Default)]
struct RegistryInner {
    callbacks: Mutex<BTreeMap<SubscriberId, LocationCallback>>,
    next_id: AtomicU64,
}

impl RegistryInner {
    fn remove(&self, id: SubscriberId) -> bool {
        self.callbacks.lock().remove(&id).is_some()
    }
}

/// Registry of location-change subscribers.
///
/// Cheap to clone; clones share the same subscriber set.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<RegistryInner>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Keep the returned [`Subscription`] to unsubscribe.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&LocationChangeEvent) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.callbacks.lock().insert(id, Arc::new(callback));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every live callback with `event`.
    pub fn notify(&self, event: &LocationChangeEvent) -> NotifyReport {
        // Snapshot so callbacks can (un)subscribe without deadlocking
        let snapshot: Vec<(SubscriberId, LocationCallback)> = self
            .inner
            .callbacks
            .lock()
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect();

        let mut report = NotifyReport::default();
        for (id, callback) in snapshot {
            // Skip subscribers removed by an earlier callback in this round
            if !self.inner.callbacks.lock().contains_key(&id) {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    let failure = SubscriberCallbackError {
                        subscriber: id,
                        message: panic_message(payload.as_ref()),
                    };
                    tracing::warn!(
                        subscriber = %id,
                        error = %failure.message,
                        "Location subscriber panicked"
                    );
                    report.failures.push(failure);
                }
            }
        }

        report
    }

    /// Remove every subscriber.
    pub fn clear(&self) {
        self.inner.callbacks.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.callbacks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by [`SubscriberRegistry::subscribe`].
///
/// Dropping the handle does not unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe).
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriberId,
    registry: Weak<RegistryInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the callback. Returns false if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(inner) => inner.remove(self.id),
            None => false,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
