//! Subscribable - explicit change notification.
//!
//! Storage backends publish [`StorageEvent`](crate::StorageEvent)s for writes
//! made by other contexts, and [`ProfileStore`](crate::ProfileStore) publishes
//! a fresh [`SessionSnapshot`](crate::SessionSnapshot) whenever its state
//! changes. Both go through the same contract: `subscribe` hands back a
//! [`Subscription`] that detaches the listener when dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// A shared notification callback.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Trait for sources that push values of `T` to registered listeners.
pub trait Subscribable<T> {
    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    fn subscribe(&self, listener: Listener<T>) -> Subscription;
}

struct ListenerTable<T> {
    next_id: AtomicU64,
    entries: RwLock<Vec<(u64, Listener<T>)>>,
}

impl<T> ListenerTable<T> {
    fn remove(&self, id: u64) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|(entry_id, _)| *entry_id != id);
    }
}

/// A list of listeners for values of `T`.
///
/// Clone-friendly (cloning shares the same listener list).
pub struct Listeners<T> {
    table: Arc<ListenerTable<T>>,
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(ListenerTable {
                next_id: AtomicU64::new(1),
                entries: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Register a listener and return its detach handle.
    pub fn add(&self, listener: Listener<T>) -> Subscription {
        let id = self.table.next_id.fetch_add(1, Ordering::Relaxed);
        self.table
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));

        let table: Weak<ListenerTable<T>> = Arc::downgrade(&self.table);
        Subscription::new(move || {
            if let Some(table) = table.upgrade() {
                table.remove(id);
            }
        })
    }

    /// Call every registered listener with `value`, in registration order.
    ///
    /// The list is copied before any listener runs, so a listener may
    /// subscribe, unsubscribe, or trigger a nested notification.
    pub fn notify(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self
            .table
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.table
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for a registered listener. Dropping it detaches the listener.
#[must_use = "dropping a Subscription detaches its listener immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(detach: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Detach the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn notify_reaches_listeners_in_order() {
        let listeners = Listeners::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        let _a = listeners.add(Arc::new(move |v: &u32| first.lock().unwrap().push(("a", *v))));
        let second = Arc::clone(&seen);
        let _b = listeners.add(Arc::new(move |v: &u32| second.lock().unwrap().push(("b", *v))));

        listeners.notify(&7);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn drop_detaches() {
        let listeners = Listeners::<u32>::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);

        let subscription = listeners.add(Arc::new(move |_: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        listeners.notify(&1);
        drop(subscription);
        listeners.notify(&2);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn unsubscribe_after_source_dropped_is_harmless() {
        let listeners = Listeners::<u32>::new();
        let subscription = listeners.add(Arc::new(|_: &u32| {}));
        drop(listeners);
        subscription.unsubscribe();
    }

    #[test]
    fn listener_may_subscribe_during_notify() {
        let listeners = Listeners::<u32>::new();
        let inner = listeners.clone();
        let held = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&held);

        let _outer = listeners.add(Arc::new(move |_: &u32| {
            let sub = inner.add(Arc::new(|_: &u32| {}));
            sink.lock().unwrap().push(sub);
        }));

        listeners.notify(&1);
        assert_eq!(listeners.len(), 2);
    }
}
