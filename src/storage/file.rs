use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::subscription::{Listener, Subscribable, Subscription};

use super::hub::ContextHub;
use super::{Storage, StorageError, StorageEvent};

const SLOT_EXTENSION: &str = "json";
const LOCK_FILE: &str = ".fitdash.lock";

struct FileArea {
    dir: PathBuf,
    // Serializes read-modify-write sequences between contexts of this process.
    write_lock: Mutex<()>,
    hub: ContextHub,
}

/// Directory-backed storage area: one `<slot>.json` file per slot.
///
/// Writes go to a uniquely named temporary file in the same directory, are
/// fsynced, then renamed over the slot file, so a crash never leaves a
/// half-written slot. Mutations also hold an exclusive lock on
/// `.fitdash.lock` in the directory, so separately opened handles and other
/// processes can write the same area concurrently (last write wins).
///
/// Change notifications only reach contexts derived from the same `open`
/// call through [`new_context`](Self::new_context). A second
/// `FileStorage::open` on the same directory, in this process or another,
/// sees the data but receives no [`StorageEvent`]s from this handle.
///
/// Clone-friendly: a clone is the same context.
#[derive(Clone)]
pub struct FileStorage {
    area: Arc<FileArea>,
    context: u64,
}

/// Exclusive advisory lock on the area, released on drop.
struct AreaLock(File);

impl Drop for AreaLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl FileStorage {
    /// Open (creating if needed) a storage area rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(dir.display().to_string(), e))?;

        let hub = ContextHub::new();
        let context = hub.open_context();
        tracing::debug!(dir = %dir.display(), "opened file storage");

        Ok(Self {
            area: Arc::new(FileArea {
                dir,
                write_lock: Mutex::new(()),
                hub,
            }),
            context,
        })
    }

    /// Open another context over the same directory.
    pub fn new_context(&self) -> Self {
        Self {
            area: Arc::clone(&self.area),
            context: self.area.hub.open_context(),
        }
    }

    pub fn context_id(&self) -> u64 {
        self.context
    }

    pub fn dir(&self) -> &Path {
        &self.area.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.area
            .dir
            .join(format!("{}.{}", encode_key(key), SLOT_EXTENSION))
    }

    fn lock_area(&self, key: &str) -> Result<AreaLock, StorageError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.area.dir.join(LOCK_FILE))
            .map_err(|e| StorageError::io(key, e))?;
        FileExt::lock_exclusive(&file).map_err(|e| StorageError::io(key, e))?;
        Ok(AreaLock(file))
    }

    fn read_slot(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    fn write_slot(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut tmp = NamedTempFile::new_in(&self.area.dir).map_err(|e| StorageError::io(key, e))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| StorageError::io(key, e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StorageError::io(key, e))?;

        // A failed persist drops the temp file, which removes it.
        tmp.persist(self.slot_path(key))
            .map(drop)
            .map_err(|e| StorageError::io(key, e.error))
    }

    fn slot_files(&self) -> Result<Vec<(String, PathBuf)>, StorageError> {
        let dir = &self.area.dir;
        let entries = fs::read_dir(dir).map_err(|e| StorageError::io(dir.display().to_string(), e))?;

        let mut slots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(dir.display().to_string(), e))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SLOT_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if let Some(key) = decode_key(stem) {
                slots.push((key, path));
            }
        }
        slots.sort();
        Ok(slots)
    }
}

impl Subscribable<StorageEvent> for FileStorage {
    fn subscribe(&self, listener: Listener<StorageEvent>) -> Subscription {
        self.area.hub.subscribe(self.context, listener)
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.read_slot(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = {
            let _guard = self
                .area
                .write_lock
                .lock()
                .map_err(|_| StorageError::LockPoisoned("write"))?;
            let _area = self.lock_area(key)?;
            let old_value = self.read_slot(key)?;
            self.write_slot(key, value)?;
            old_value
        };

        if old_value.as_deref() != Some(value) {
            let event = StorageEvent::changed(key, old_value, Some(value.to_string()));
            self.area.hub.broadcast(self.context, &event);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let old_value = {
            let _guard = self
                .area
                .write_lock
                .lock()
                .map_err(|_| StorageError::LockPoisoned("remove"))?;
            let _area = self.lock_area(key)?;
            let old_value = self.read_slot(key)?;
            if old_value.is_some() {
                match fs::remove_file(self.slot_path(key)) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(StorageError::io(key, e)),
                }
            }
            old_value
        };

        if old_value.is_some() {
            let event = StorageEvent::changed(key, old_value, None);
            self.area.hub.broadcast(self.context, &event);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let removed = {
            let _guard = self
                .area
                .write_lock
                .lock()
                .map_err(|_| StorageError::LockPoisoned("clear"))?;
            let _area = self.lock_area(LOCK_FILE)?;
            let slots = self.slot_files()?;
            for (key, path) in &slots {
                match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(StorageError::io(key.as_str(), e)),
                }
            }
            !slots.is_empty()
        };

        if removed {
            self.area.hub.broadcast(self.context, &StorageEvent::cleared());
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.slot_files()?.into_iter().map(|(key, _)| key).collect())
    }
}

/// Slot names become percent-encoded file stems. `.` is escaped as well so
/// a stem never hides a file or splits off an extension.
fn encode_key(key: &str) -> String {
    urlencoding::encode(key).replace('.', "%2E")
}

/// Inverse of [`encode_key`]. Stems that `encode_key` would not produce
/// (stray files in the directory) are not slots.
fn decode_key(stem: &str) -> Option<String> {
    let key = urlencoding::decode(stem).ok().map(Cow::into_owned)?;
    (encode_key(&key) == stem).then_some(key)
}
