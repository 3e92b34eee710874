//! Storage - durable, string-keyed slots shared between contexts.
//!
//! A storage area is a flat map of slot name to string value. Several
//! *contexts* (the analogue of browser tabs) can open the same area; a write
//! made through one context is announced to the subscribers of every *other*
//! context, never to the writer itself.
//!
//! ```text
//!   context A ──set_item("user")──▶ ┌──────────────┐
//!                                   │ storage area │
//!   context B ◀──StorageEvent────── └──────────────┘
//! ```
//!
//! ## Backends
//!
//! - [`InMemoryStorage`]: process-local area, optional byte quota. Used by tests.
//! - [`FileStorage`]: one JSON file per slot in a directory.
//!
//! Values are JSON text by convention; [`StorageExt`] provides typed
//! `load_json`/`save_json` helpers with the read-side soft-failure policy.

mod error;
mod file;
mod hub;
mod in_memory;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::subscription::{Listener, Subscribable, Subscription};

pub use error::StorageError;
pub use file::FileStorage;
pub use in_memory::InMemoryStorage;

/// A change made to a storage area by another context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// The slot that changed. `None` when the whole area was cleared.
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl StorageEvent {
    pub fn changed(key: &str, old_value: Option<String>, new_value: Option<String>) -> Self {
        Self {
            key: Some(key.to_string()),
            old_value,
            new_value,
        }
    }

    pub fn cleared() -> Self {
        Self {
            key: None,
            old_value: None,
            new_value: None,
        }
    }

    /// True when this event affects `key` (a clear affects every slot).
    pub fn touches(&self, key: &str) -> bool {
        self.key.as_deref().map_or(true, |k| k == key)
    }
}

/// Abstract durable slot storage.
///
/// [`Subscribable::subscribe`] delivers changes made by other contexts over
/// the same area, synchronously, after the writer has released its locks.
pub trait Storage: Subscribable<StorageEvent> + Send + Sync {
    /// Read a slot. `Ok(None)` when the slot does not exist.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a slot, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a slot. Removing a missing slot is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every slot.
    fn clear(&self) -> Result<(), StorageError>;

    /// Names of all slots currently present.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

impl<S: Storage + ?Sized> Subscribable<StorageEvent> for Arc<S> {
    fn subscribe(&self, listener: Listener<StorageEvent>) -> Subscription {
        (**self).subscribe(listener)
    }
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        (**self).keys()
    }
}

/// Typed JSON access on any [`Storage`].
pub trait StorageExt: Storage {
    /// Read and decode a JSON slot.
    ///
    /// Missing, unreadable and unparsable slots all come back as `None`;
    /// the latter two are logged. The next successful write heals the slot.
    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(slot = key, error = %err, "storage read failed, treating slot as empty");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(slot = key, error = %err, "discarding unparsable slot");
                None
            }
        }
    }

    /// Encode `value` as JSON and write it to `key`.
    fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.set_item(key, &raw)
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}
