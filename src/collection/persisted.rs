use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::storage::{Storage, StorageError, StorageExt};

use super::{CollectionError, Record, RecordId};

/// A newest-first list of records mirrored to the `T::SLOT` storage slot.
///
/// Every mutation writes the full list to storage before the in-memory list
/// is replaced, so a failed write leaves both sides as they were.
/// Clone-friendly (clones share the same in-memory list).
pub struct PersistedCollection<S, T> {
    storage: S,
    records: Arc<RwLock<Vec<T>>>,
}

impl<S: Clone, T> Clone for PersistedCollection<S, T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            records: Arc::clone(&self.records),
        }
    }
}

impl<S: Storage, T: Record> PersistedCollection<S, T> {
    /// Create a collection over `storage`, hydrated from its slot.
    pub fn open(storage: S) -> Self {
        let collection = Self {
            storage,
            records: Arc::new(RwLock::new(Vec::new())),
        };
        collection.reload();
        collection
    }

    pub fn slot(&self) -> &'static str {
        T::SLOT
    }

    /// Read the slot. Missing or unparsable data reads as an empty list.
    ///
    /// Does not touch the in-memory list; see [`reload`](Self::reload).
    pub fn load(&self) -> Vec<T> {
        self.storage.load_json::<Vec<T>>(T::SLOT).unwrap_or_default()
    }

    /// Replace the in-memory list with what storage currently holds.
    pub fn reload(&self) {
        let loaded = self.load();
        *self.write_records() = loaded;
    }

    /// The current list, newest first.
    pub fn list(&self) -> Vec<T> {
        self.read_records().clone()
    }

    pub fn get(&self, id: impl AsRef<str>) -> Option<T> {
        let id = id.as_ref();
        self.read_records().iter().find(|r| r.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_records().is_empty()
    }

    /// Create a record from `draft` with a fresh id and put it at the head.
    pub fn add(&self, draft: T::Draft) -> Result<T, CollectionError> {
        let mut records = self.write_records();

        let mut id = RecordId::generate();
        while records.iter().any(|r| r.id() == &id) {
            id = RecordId::generate();
        }
        let record = T::from_draft(id, draft);

        let mut next = Vec::with_capacity(records.len() + 1);
        next.push(record.clone());
        next.extend(records.iter().cloned());
        self.persist(&next)?;
        *records = next;

        tracing::debug!(slot = T::SLOT, id = %record.id(), "record added");
        Ok(record)
    }

    /// Shallow-merge the fields set in `patch` into the record with `id`.
    ///
    /// An unknown id is a no-op. The id itself is never changed.
    pub fn update(&self, id: impl AsRef<str>, patch: &T::Patch) -> Result<(), CollectionError> {
        let id = id.as_ref();
        let mut records = self.write_records();

        let Some(index) = records.iter().position(|r| r.id() == id) else {
            tracing::debug!(slot = T::SLOT, id, "update skipped, no such record");
            return Ok(());
        };

        let merged = merge_patch(&records[index], patch)?;
        let mut next = records.clone();
        next[index] = merged;
        self.persist(&next)?;
        *records = next;

        tracing::debug!(slot = T::SLOT, id, "record updated");
        Ok(())
    }

    /// Remove the record with `id`. An unknown id is a no-op.
    pub fn remove(&self, id: impl AsRef<str>) -> Result<(), CollectionError> {
        let id = id.as_ref();
        let mut records = self.write_records();

        let Some(index) = records.iter().position(|r| r.id() == id) else {
            tracing::debug!(slot = T::SLOT, id, "remove skipped, no such record");
            return Ok(());
        };

        let mut next = records.clone();
        next.remove(index);
        self.persist(&next)?;
        *records = next;

        tracing::debug!(slot = T::SLOT, id, "record removed");
        Ok(())
    }

    fn persist(&self, records: &[T]) -> Result<(), StorageError> {
        self.storage.save_json(T::SLOT, records).map_err(|err| {
            tracing::error!(slot = T::SLOT, error = %err, "failed to persist collection");
            err
        })
    }

    fn read_records(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_records(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn merge_patch<T: Record>(record: &T, patch: &T::Patch) -> Result<T, CollectionError> {
    let invalid = |reason: String| CollectionError::InvalidPatch {
        id: record.id().clone(),
        reason,
    };

    let mut value = serde_json::to_value(record).map_err(|e| invalid(e.to_string()))?;
    let changes = serde_json::to_value(patch).map_err(|e| invalid(e.to_string()))?;

    let (Some(target), Value::Object(changes)) = (value.as_object_mut(), changes) else {
        return Err(invalid("record and patch must both be JSON objects".to_string()));
    };
    for (field, change) in changes {
        if field != "id" {
            target.insert(field, change);
        }
    }

    let merged: T = serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
    if merged.id() != record.id() {
        return Err(invalid("patch may not change the record id".to_string()));
    }
    Ok(merged)
}
