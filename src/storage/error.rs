use thiserror::Error;

/// Error type for durable storage writes.
///
/// Reads never surface these to callers of the stores: an unreadable slot is
/// treated as absent. Writes propagate them because nothing can recover
/// locally from a full or broken storage area.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The write would push the storage area past its quota.
    #[error("storage quota exceeded writing `{key}` ({needed} bytes needed, quota {quota})")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
    /// The backing file for a slot could not be read or written.
    #[error("storage i/o error on `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// A value could not be encoded as JSON.
    #[error("storage encode error: {0}")]
    Encode(#[from] serde_json::Error),
    /// The underlying lock was poisoned (a thread panicked while holding it).
    #[error("storage lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl StorageError {
    pub(crate) fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            key: key.into(),
            source,
        }
    }
}
