//! Cross-context session sync.
//!
//! When another context signs in, signs out or switches profile, the
//! session slots change underneath this context's [`ProfileStore`].
//! [`CrossTabSync`] listens for those storage events and reloads the store.

use crate::profile::{ProfileStore, WeakProfileStore, SESSION_SLOTS};
use crate::storage::{Storage, StorageEvent};
use crate::subscription::{Subscribable, Subscription};

use std::sync::Arc;

/// Keeps a [`ProfileStore`] in step with writes made by other contexts.
///
/// The store is held weakly; once every store handle is gone, events are
/// ignored. Dropping the `CrossTabSync` detaches it from storage.
#[must_use = "dropping CrossTabSync detaches it immediately"]
pub struct CrossTabSync {
    subscription: Subscription,
}

impl CrossTabSync {
    /// Reload `store` whenever another context touches a session slot.
    ///
    /// `storage` must be the context the store reads from. Reloads run
    /// synchronously inside the writer's notification.
    pub fn attach<S>(storage: &S, store: &ProfileStore<S>) -> Self
    where
        S: Storage + Clone + 'static,
    {
        let target: WeakProfileStore<S> = store.downgrade();
        let subscription = storage.subscribe(Arc::new(move |event: &StorageEvent| {
            if !affects_session(event) {
                return;
            }
            let Some(store) = target.upgrade() else {
                return;
            };
            tracing::debug!(key = ?event.key, "session changed in another context, reloading");
            store.load_profile_data();
        }));
        Self { subscription }
    }

    /// Stop listening. Same as dropping.
    pub fn detach(self) {
        self.subscription.unsubscribe();
    }
}

fn affects_session(event: &StorageEvent) -> bool {
    SESSION_SLOTS.iter().any(|slot| event.touches(slot))
}
