//! Per-area registry of contexts and their change listeners.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::subscription::{Listener, Listeners, Subscription};

use super::StorageEvent;

/// Routes a write from one context to the listeners of all the others.
pub(crate) struct ContextHub {
    next_context: AtomicU64,
    contexts: RwLock<HashMap<u64, Listeners<StorageEvent>>>,
}

impl ContextHub {
    pub(crate) fn new() -> Self {
        Self {
            next_context: AtomicU64::new(1),
            contexts: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn open_context(&self) -> u64 {
        self.next_context.fetch_add(1, Ordering::Relaxed)
    }

    /// The listener is added under the map lock so a concurrent prune in
    /// [`broadcast`](Self::broadcast) cannot orphan it.
    pub(crate) fn subscribe(&self, context: u64, listener: Listener<StorageEvent>) -> Subscription {
        let mut contexts = self.contexts.write().unwrap_or_else(PoisonError::into_inner);
        contexts.entry(context).or_default().add(listener)
    }

    /// Deliver `event` to every context except `origin`.
    ///
    /// Must be called after the writer has dropped its storage locks.
    pub(crate) fn broadcast(&self, origin: u64, event: &StorageEvent) {
        let targets: Vec<Listeners<StorageEvent>> = {
            let mut contexts = self.contexts.write().unwrap_or_else(PoisonError::into_inner);
            // Contexts whose subscriptions have all been dropped.
            contexts.retain(|_, listeners| !listeners.is_empty());
            contexts
                .iter()
                .filter(|(context, _)| **context != origin)
                .map(|(_, listeners)| listeners.clone())
                .collect()
        };

        if !targets.is_empty() {
            tracing::trace!(origin, key = ?event.key, contexts = targets.len(), "broadcasting storage change");
        }
        for listeners in targets {
            listeners.notify(event);
        }
    }
}
