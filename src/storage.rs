//! Key-value storage backends
//!
//! The board persists through a plain get/set/remove interface, the same
//! shape as browser local storage. Two backends are provided:
//!
//! ```text
//! <data_dir>/                   # FileStore root
//!   kanban.toml                 # Optional configuration
//!   <key>.json                  # One document per key
//!   <key>.lock                  # Advisory lock for writers
//! ```
//!
//! and [`MemoryStore`], a shared in-process map used by tests and as a
//! fallback when no data directory can be resolved.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};

/// Durable string key-value store
pub trait KeyValueStore {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Reject keys that cannot be used as a file stem
pub fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidArgument("storage key cannot be empty".to_string()));
    }
    if key.starts_with('.')
        || !key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
    {
        return Err(Error::InvalidArgument(format!(
            "storage key '{key}' must match [A-Za-z0-9._-] and not start with '.'"
        )));
    }
    Ok(())
}

/// Directory-backed store: each key is a JSON document on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    /// Path of the document holding `key`
    pub fn value_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Path of the lock guarding `key`
    pub fn lock_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.lock"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.value_path(key);
        if !path.exists() {
            return Ok(None);
        }
        lock::read_locked(&path, self.lock_path(key), self.lock_timeout_ms)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        lock::write_atomic_locked(
            self.value_path(key),
            self.lock_path(key),
            value.as_bytes(),
            self.lock_timeout_ms,
        )
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let guard = lock::FileLock::acquire(self.lock_path(key), self.lock_timeout_ms)?;
        remove_if_present(&self.value_path(key))?;
        drop(guard);
        // a removed key leaves no lock file behind
        remove_if_present(&self.lock_path(key))
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Error::Io(err)),
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    fail_writes: bool,
}

/// In-process store. Clones share the same map, so a test can keep a handle
/// after moving one into a [`crate::task::TaskStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set`/`remove` fail, like a full or disabled
    /// browser storage
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner().fail_writes = fail;
    }

    /// Raw value under `key`, bypassing the trait
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner().entries.get(key).cloned()
    }

    /// Overwrite the raw value under `key`, ignoring `fail_writes`
    pub fn put_raw(&self, key: &str, value: &str) {
        self.inner()
            .entries
            .insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.inner().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn inner(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner().entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner();
        if inner.fail_writes {
            return Err(Error::OperationFailed(format!(
                "storage rejected write for '{key}'"
            )));
        }
        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut inner = self.inner();
        if inner.fail_writes {
            return Err(Error::OperationFailed(format!(
                "storage rejected removal of '{key}'"
            )));
        }
        inner.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_round_trip_and_remove() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.get("kanban-tasks").unwrap(), None);
        store.set("kanban-tasks", "[]").unwrap();
        assert_eq!(store.get("kanban-tasks").unwrap().as_deref(), Some("[]"));
        assert!(store.value_path("kanban-tasks").exists());

        store.remove("kanban-tasks").unwrap();
        assert_eq!(store.get("kanban-tasks").unwrap(), None);
        assert!(!store.lock_path("kanban-tasks").exists());
        store.remove("kanban-tasks").unwrap();
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path());

        for key in ["", "../escape", "a/b", ".hidden"] {
            let err = store.set(key, "x").expect_err("key should be rejected");
            assert!(matches!(err, Error::InvalidArgument(_)), "{key}: {err:?}");
        }
    }

    #[test]
    fn memory_store_clones_share_entries() {
        let handle = MemoryStore::new();
        let mut writer = handle.clone();

        writer.set("k", "v").unwrap();
        assert_eq!(handle.raw("k").as_deref(), Some("v"));
        assert_eq!(handle.len(), 1);

        writer.remove("k").unwrap();
        assert!(handle.is_empty());
    }

    #[test]
    fn memory_store_write_failure_injection() {
        let handle = MemoryStore::new();
        let mut writer = handle.clone();
        handle.set_fail_writes(true);

        assert!(writer.set("k", "v").is_err());
        assert!(writer.remove("k").is_err());
        assert_eq!(writer.get("k").unwrap(), None);

        handle.set_fail_writes(false);
        writer.set("k", "v").unwrap();
        assert_eq!(writer.get("k").unwrap().as_deref(), Some("v"));
    }
}
