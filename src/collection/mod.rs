//! Collections - ordered, durable lists of UUID-keyed records.
//!
//! Every domain store (members, training sessions, classes, products,
//! orders) is the same thing: a newest-first list of records persisted as a
//! JSON array under one storage slot. [`PersistedCollection`] implements that
//! once; a record type only has to implement [`Record`], usually through
//! `#[derive(Record)]`.
//!
//! ## Example
//!
//! ```ignore
//! use fitdash::{InMemoryStorage, PersistedCollection, Member, MemberDraft};
//!
//! let storage = InMemoryStorage::new();
//! let members = PersistedCollection::<_, Member>::open(storage);
//! let created = members.add(MemberDraft { name: "Ada".into(), ..draft })?;
//! members.update(created.id(), &MemberPatch { phone: Some("555".into()), ..Default::default() })?;
//! members.remove(created.id())?;
//! ```

mod persisted;

use std::borrow::Borrow;
use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::StorageError;

pub use persisted::PersistedCollection;

/// Identifier of a record. Generated as a UUID v4 string at creation.
///
/// Ids read back from storage are kept verbatim even if they are not UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// A fresh random (v4) id.
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId(value)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for RecordId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RecordId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Trait for types that can be stored in a [`PersistedCollection`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The storage slot holding this record type (e.g. "members", "orders").
    const SLOT: &'static str;

    /// A record without its id, as supplied by callers of `add`.
    type Draft;

    /// A partial update. Serializes to a JSON object holding only the fields
    /// to change.
    type Patch: Serialize;

    /// Returns the unique identifier for this record.
    fn id(&self) -> &RecordId;

    /// Build a record from a draft, applying domain defaults.
    fn from_draft(id: RecordId, draft: Self::Draft) -> Self;
}

/// Error type for collection operations.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// Writing the list to storage failed (quota, i/o, ...).
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A patch could not be merged into the record.
    #[error("invalid patch for record {id}: {reason}")]
    InvalidPatch { id: RecordId, reason: String },
}
