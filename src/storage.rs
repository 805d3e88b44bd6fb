//! Durable seen-flag storage
//!
//! The funnel remembers exactly one fact across sessions: whether the visitor
//! has already sat through the reveal delay. It is kept under a single key as
//! the string `"true"`; a missing key, or any other value, reads as `false`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;

/// Key holding the seen flag.
pub const SEEN_FLAG_KEY: &str = "hasSeenDelay";

/// Stored value meaning "seen".
pub const SEEN_FLAG_VALUE: &str = "true";

/// String key-value storage that survives the session.
pub trait FlagStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Reads the seen flag from `store`.
///
/// # Errors
///
/// Propagates storage errors; callers treat them as "not seen".
pub fn read_seen_flag(store: &dyn FlagStore) -> Result<bool, StorageError> {
    Ok(store.get(SEEN_FLAG_KEY)?.as_deref() == Some(SEEN_FLAG_VALUE))
}

/// Writes the seen flag to `store`.
///
/// # Errors
///
/// Propagates storage errors.
pub fn write_seen_flag(store: &dyn FlagStore) -> Result<(), StorageError> {
    store.set(SEEN_FLAG_KEY, SEEN_FLAG_VALUE)
}

// ============================================================================
// File store
// ============================================================================

/// JSON object on disk, one string value per key.
///
/// A missing file is an empty store. Writes go to a sibling temp file first
/// and are renamed into place.
#[derive(Debug)]
pub struct FileFlagStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileFlagStore {
    /// Creates a store backed by `path`. Nothing is touched until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(map).map_err(|e| StorageError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl FlagStore for FileFlagStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        // A corrupt file is replaced rather than blocking the write forever.
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(StorageError::Corrupt { .. }) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store, lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    entries: Mutex<BTreeMap<String, String>>,
    writes: std::sync::atomic::AtomicUsize,
}

impl MemoryFlagStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the seen flag already set.
    #[must_use]
    pub fn seen() -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(SEEN_FLAG_KEY.to_string(), SEEN_FLAG_VALUE.to_string());
        store
    }

    /// Number of successful `set` calls.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        self.writes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

/// Store that fails every operation, standing in for blocked storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl FlagStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_false() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileFlagStore::new(dir.path().join("state.json"));
        assert!(!read_seen_flag(&store).unwrap());
    }

    #[test]
    fn test_file_round_trip_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let store = FileFlagStore::new(&path);
        write_seen_flag(&store).unwrap();

        let reopened = FileFlagStore::new(&path);
        assert!(read_seen_flag(&reopened).unwrap());

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed[SEEN_FLAG_KEY], "true");
    }

    #[test]
    fn test_other_values_read_false() {
        let store = MemoryFlagStore::new();
        store.set(SEEN_FLAG_KEY, "yes").unwrap();
        assert!(!read_seen_flag(&store).unwrap());
    }

    #[test]
    fn test_file_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileFlagStore::new(dir.path().join("state.json"));
        store.set("theme", "dark").unwrap();
        write_seen_flag(&store).unwrap();
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_corrupt_file_errors_on_read_and_heals_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileFlagStore::new(&path);

        assert!(matches!(
            read_seen_flag(&store),
            Err(StorageError::Corrupt { .. })
        ));

        write_seen_flag(&store).unwrap();
        assert!(read_seen_flag(&store).unwrap());
    }

    #[test]
    fn test_unavailable_store() {
        assert!(read_seen_flag(&UnavailableStore).is_err());
        assert!(write_seen_flag(&UnavailableStore).is_err());
    }

    #[test]
    fn test_memory_seen_constructor() {
        let store = MemoryFlagStore::seen();
        assert!(read_seen_flag(&store).unwrap());
        assert_eq!(store.write_count(), 0);
    }
}
