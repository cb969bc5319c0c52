//! Persistence port for the task list.
//!
//! The store saves after every mutation and never lets a storage failure
//! escape: [`TaskPersistence::load`] degrades to an empty list and
//! [`TaskPersistence::save`] errors are logged by the caller.

use std::collections::HashSet;

use crate::error::Result;
use crate::storage::KeyValueStore;
use crate::task::Task;

/// Key the task list is stored under unless configured otherwise
pub const DEFAULT_STORAGE_KEY: &str = "kanban-tasks";

const AVAILABILITY_SUFFIX: &str = ".check";

/// Durable home of the ordered task list
pub trait TaskPersistence {
    /// Load the saved list. Absent, unreadable or malformed data is an empty
    /// list, never an error.
    fn load(&self) -> Vec<Task>;

    /// Replace the saved list
    fn save(&mut self, tasks: &[Task]) -> Result<()>;

    /// Test the backend with a write/delete round trip under a scratch key
    fn is_available(&mut self) -> bool;
}

/// Stores the list as a JSON array under one key of a [`KeyValueStore`]
#[derive(Debug, Clone)]
pub struct KeyValuePersistence<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> KeyValuePersistence<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

}

impl<S: KeyValueStore> TaskPersistence for KeyValuePersistence<S> {
    fn load(&self) -> Vec<Task> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "task list unreadable, starting empty");
                return Vec::new();
            }
        };
        if raw.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str::<Vec<Task>>(&raw) {
            Ok(tasks) => dedupe_tasks(tasks),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "task list malformed, starting empty");
                Vec::new()
            }
        }
    }

    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        let json = serde_json::to_string(tasks)?;
        self.store.set(&self.key, &json)
    }

    fn is_available(&mut self) -> bool {
        let scratch = format!("{}{}", self.key, AVAILABILITY_SUFFIX);
        let written = self.store.set(&scratch, "1");
        let removed = self.store.remove(&scratch);
        match (written, removed) {
            (Ok(()), Ok(())) => true,
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(key = %self.key, error = %err, "storage availability check failed");
                false
            }
        }
    }
}

/// Keep the first occurrence of each id
fn dedupe_tasks(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    let before = tasks.len();
    let kept: Vec<Task> = tasks
        .into_iter()
        .filter(|task| seen.insert(task.id.clone()))
        .collect();
    if kept.len() != before {
        tracing::warn!(
            dropped = before - kept.len(),
            "dropped tasks with duplicate ids from saved list"
        );
    }
    kept
}
