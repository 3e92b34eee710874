use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::subscription::{Listener, Subscribable, Subscription};

use super::hub::ContextHub;
use super::{Storage, StorageError, StorageEvent};

struct Area {
    items: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
    hub: ContextHub,
}

/// In-memory storage area backed by a `HashMap`.
///
/// Clone-friendly: a clone is the *same* context over the same area.
/// Use [`new_context`](Self::new_context) to open another context that
/// receives this one's writes as [`StorageEvent`]s.
#[derive(Clone)]
pub struct InMemoryStorage {
    area: Arc<Area>,
    context: u64,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    /// Create a new empty area without a quota.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a new empty area that rejects writes once keys plus values
    /// exceed `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self::build(Some(quota))
    }

    fn build(quota: Option<usize>) -> Self {
        let hub = ContextHub::new();
        let context = hub.open_context();
        Self {
            area: Arc::new(Area {
                items: RwLock::new(HashMap::new()),
                quota,
                hub,
            }),
            context,
        }
    }

    /// Open another context over the same area.
    pub fn new_context(&self) -> Self {
        Self {
            area: Arc::clone(&self.area),
            context: self.area.hub.open_context(),
        }
    }

    pub fn context_id(&self) -> u64 {
        self.context
    }

    /// Bytes currently used by keys and values.
    pub fn usage(&self) -> Result<usize, StorageError> {
        let items = self
            .area
            .items
            .read()
            .map_err(|_| StorageError::LockPoisoned("usage"))?;
        Ok(usage_of(&items))
    }
}

fn usage_of(items: &HashMap<String, String>) -> usize {
    items.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl Subscribable<StorageEvent> for InMemoryStorage {
    fn subscribe(&self, listener: Listener<StorageEvent>) -> Subscription {
        self.area.hub.subscribe(self.context, listener)
    }
}

impl Storage for InMemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self
            .area
            .items
            .read()
            .map_err(|_| StorageError::LockPoisoned("read"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = {
            let mut items = self
                .area
                .items
                .write()
                .map_err(|_| StorageError::LockPoisoned("write"))?;

            if let Some(quota) = self.area.quota {
                let current = items.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
                let needed = usage_of(&items) - current + key.len() + value.len();
                if needed > quota {
                    return Err(StorageError::QuotaExceeded {
                        key: key.to_string(),
                        needed,
                        quota,
                    });
                }
            }

            items.insert(key.to_string(), value.to_string())
        };

        if old_value.as_deref() != Some(value) {
            let event = StorageEvent::changed(key, old_value, Some(value.to_string()));
            self.area.hub.broadcast(self.context, &event);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let old_value = self
            .area
            .items
            .write()
            .map_err(|_| StorageError::LockPoisoned("remove"))?
            .remove(key);

        if old_value.is_some() {
            let event = StorageEvent::changed(key, old_value, None);
            self.area.hub.broadcast(self.context, &event);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let had_items = {
            let mut items = self
                .area
                .items
                .write()
                .map_err(|_| StorageError::LockPoisoned("clear"))?;
            let had_items = !items.is_empty();
            items.clear();
            had_items
        };

        if had_items {
            self.area.hub.broadcast(self.context, &StorageEvent::cleared());
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let items = self
            .area
            .items
            .read()
            .map_err(|_| StorageError::LockPoisoned("keys"))?;
        let mut keys: Vec<String> = items.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
