//! Persistent storage collaborator for the offline queue.
//!
//! The client can mirror its outbound queue to an external key/value store
//! so messages queued while disconnected survive a process restart. The
//! store is a collaborator, not part of the core: anything that can hold a
//! string under a string key qualifies.
//!
//! # Shipped Implementations
//!
//! | Store | Backing | Survives restart |
//! |-------|---------|------------------|
//! | [`MemoryStore`] | In-process map | No (tests, single-process reuse) |
//! | [`FileStore`] | Single JSON file | Yes |

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;
use std::path::PathBuf;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

// ============================================================================
// QueueStore
// ============================================================================

/// Key/value collaborator for offline queue persistence.
///
/// Implementations must be cheap to call from the client worker: `set` runs
/// after every enqueue while disconnected.
pub trait QueueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] or [`Error::Io`] if the backing store fails.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] or [`Error::Io`] if the backing store fails.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-process store backed by a hash map.
///
/// Does not survive a restart; useful for tests and for sharing a queue
/// between clients within one process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Stored entries.
    entries: Mutex<FxHashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if the store holds no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl QueueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// FileStore
// ============================================================================

/// Store backed by a single JSON file.
///
/// The file holds one JSON object mapping keys to values and is rewritten on
/// every `set`. A missing file reads as an empty store.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Path of the backing file.
    path: PathBuf,
}

impl FileStore {
    /// Creates a store backed by the file at `path`.
    ///
    /// The file is created on the first `set`.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the backing file.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Reads the full entry map from disk.
    fn read_entries(&self) -> Result<FxHashMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FxHashMap::default()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl QueueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        std::fs::write(&self.path, serde_json::to_string(&entries)?)?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("queue").expect("get"), None);

        store.set("queue", r#"["a","b"]"#).expect("set");
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("queue").expect("get"),
            Some(r#"["a","b"]"#.to_string())
        );
    }

    #[test]
    fn test_memory_store_set_replaces() {
        let store = MemoryStore::new();
        store.set("queue", "old").expect("set");
        store.set("queue", "new").expect("set");
        assert_eq!(store.get("queue").expect("get"), Some("new".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("queue.json"));
        assert_eq!(store.get("queue").expect("get"), None);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("queue.json");

        let store = FileStore::new(&path);
        store.set("queue", r#"["x"]"#).expect("set");
        store.set("other", "value").expect("set");

        // A fresh store over the same file sees the same entries.
        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get("queue").expect("get"),
            Some(r#"["x"]"#.to_string())
        );
        assert_eq!(reopened.get("other").expect("get"), Some("value".to_string()));
    }

    #[test]
    fn test_file_store_corrupt_file_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("queue.json");
        std::fs::write(&path, "not json").expect("write");

        let store = FileStore::new(&path);
        assert!(matches!(store.get("queue"), Err(Error::Json(_))));
    }
}
