//! Task model and the task store.
//!
//! The store owns one ordered `Vec<Task>`. A column's display order is the
//! order of its tasks in that list; order across columns carries no meaning.
//! Every mutation bumps [`TaskStore::revision`] and saves through the
//! persistence port. Unknown ids are reported as
//! [`MutationOutcome::NotFound`] and logged, never raised: a stale card in
//! the UI racing a delete from another terminal is expected.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result, ValidationError};
use crate::persistence::{KeyValuePersistence, TaskPersistence};
use crate::storage::MemoryStore;

pub const TITLE_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;
const SHORT_ID_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Column order on the board
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }

    /// Column heading
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    pub fn index(self) -> usize {
        match self {
            TaskStatus::Todo => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Done => 2,
        }
    }

    /// Lenient parse of a status tag (`in-progress`, `in_progress`,
    /// `inprogress` and any casing)
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "todo" => Some(TaskStatus::Todo),
            "inprogress" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TaskStatus::parse(s).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "invalid status '{s}': must be todo, in-progress, or done"
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Trailing characters of the id, enough to tell cards apart
    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }

    /// Case-insensitive substring match on title or description.
    /// `needle` must already be lowercase.
    fn matches_lowercase(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

pub fn short_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let start = chars.len().saturating_sub(SHORT_ID_LEN);
    chars[start..].iter().collect::<String>().to_lowercase()
}

/// Trim and check user input, returning the values to store
pub fn validate_input(
    title: &str,
    description: &str,
) -> std::result::Result<(String, String), ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let title_len = title.chars().count();
    if title_len > TITLE_MAX_LEN {
        return Err(ValidationError::TitleTooLong {
            len: title_len,
            max: TITLE_MAX_LEN,
        });
    }
    let description = description.trim();
    let description_len = description.chars().count();
    if description_len > DESCRIPTION_MAX_LEN {
        return Err(ValidationError::DescriptionTooLong {
            len: description_len,
            max: DESCRIPTION_MAX_LEN,
        });
    }
    Ok((title.to_string(), description.to_string()))
}

/// Result of a mutation that tolerates unknown ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    NotFound,
}

impl MutationOutcome {
    pub fn is_applied(self) -> bool {
        self == MutationOutcome::Applied
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl StatusCounts {
    pub fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Todo => self.todo,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Done => self.done,
        }
    }

    pub fn total(&self) -> usize {
        self.todo + self.in_progress + self.done
    }
}

pub struct TaskStore {
    tasks: Vec<Task>,
    persistence: Box<dyn TaskPersistence>,
    revision: u64,
    last_persist_error: Option<String>,
}

impl fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks)
            .field("revision", &self.revision)
            .field("last_persist_error", &self.last_persist_error)
            .finish_non_exhaustive()
    }
}

impl TaskStore {
    /// Load the saved list and take ownership of the persistence port
    pub fn open(persistence: impl TaskPersistence + 'static) -> Self {
        let tasks = persistence.load();
        tracing::debug!(count = tasks.len(), "task store opened");
        Self {
            tasks,
            persistence: Box::new(persistence),
            revision: 0,
            last_persist_error: None,
        }
    }

    /// Store backed by a fresh in-memory map
    pub fn in_memory() -> Self {
        Self::open(KeyValuePersistence::new(MemoryStore::new()))
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Incremented by every mutation and reload
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Message of the most recent failed save, cleared by the next success
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    pub fn persistence_available(&mut self) -> bool {
        self.persistence.is_available()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn create(&mut self, title: &str, description: &str) -> Result<Task> {
        let (title, description) = validate_input(title, description)?;
        let now = Utc::now();
        let task = Task {
            id: self.fresh_id(),
            title,
            description,
            status: TaskStatus::Todo,
            created_at: now,
            updated_at: now,
        };
        tracing::debug!(task_id = %task.id, "task created");
        self.tasks.push(task.clone());
        self.commit();
        Ok(task)
    }

    /// Replace title and description. Validation runs before the lookup, so
    /// invalid input is an error even for an unknown id.
    pub fn update(&mut self, id: &str, title: &str, description: &str) -> Result<MutationOutcome> {
        let (title, description) = validate_input(title, description)?;
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            tracing::warn!(task_id = %id, "update: task not found");
            return Ok(MutationOutcome::NotFound);
        };
        task.title = title;
        task.description = description;
        task.updated_at = Utc::now();
        self.commit();
        Ok(MutationOutcome::Applied)
    }

    /// Change the status in place; the task keeps its slot in the global list
    pub fn update_status(&mut self, id: &str, status: TaskStatus) -> MutationOutcome {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            tracing::warn!(task_id = %id, status = %status, "update_status: task not found");
            return MutationOutcome::NotFound;
        };
        task.status = status;
        task.updated_at = Utc::now();
        self.commit();
        MutationOutcome::Applied
    }

    /// Place the task at `position` among the tasks of `status`.
    ///
    /// Positions past the end of the group append. Every other task keeps
    /// its relative order; the rebuilt list is the untouched tasks followed
    /// by the target group.
    pub fn move_to_position(
        &mut self,
        id: &str,
        status: TaskStatus,
        position: usize,
    ) -> MutationOutcome {
        let Some(from) = self.tasks.iter().position(|task| task.id == id) else {
            tracing::warn!(task_id = %id, status = %status, position, "move_to_position: task not found");
            return MutationOutcome::NotFound;
        };

        let mut moved = self.tasks.remove(from);
        moved.status = status;
        moved.updated_at = Utc::now();

        let (mut target, others): (Vec<Task>, Vec<Task>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|task| task.status == status);

        let index = position.min(target.len());
        target.insert(index, moved);

        self.tasks = others;
        self.tasks.extend(target);
        tracing::debug!(task_id = %id, status = %status, index, "task moved");
        self.commit();
        MutationOutcome::Applied
    }

    pub fn delete(&mut self, id: &str) -> MutationOutcome {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            tracing::warn!(task_id = %id, "delete: task not found");
            return MutationOutcome::NotFound;
        };
        self.tasks.remove(index);
        tracing::debug!(task_id = %id, "task deleted");
        self.commit();
        MutationOutcome::Applied
    }

    /// Tasks of one column in display order
    pub fn by_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| task.status == status)
            .collect()
    }

    /// Case-insensitive match on title or description; a blank query
    /// returns every task
    pub fn search(&self, query: &str) -> Vec<&Task> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.tasks.iter().collect();
        }
        self.tasks
            .iter()
            .filter(|task| task.matches_lowercase(&needle))
            .collect()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for task in &self.tasks {
            match task.status {
                TaskStatus::Todo => counts.todo += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Done => counts.done += 1,
            }
        }
        counts
    }

    /// Resolve a full id, or a unique prefix or suffix of one, ignoring case
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        let needle = input.trim().to_lowercase();
        if needle.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }

        if let Some(task) = self
            .tasks
            .iter()
            .find(|task| task.id.to_lowercase() == needle)
        {
            return Ok(task.id.clone());
        }

        let matches: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|task| {
                let id = task.id.to_lowercase();
                id.starts_with(&needle) || id.ends_with(&needle)
            })
            .collect();

        match matches.as_slice() {
            [] => Err(Error::TaskNotFound(input.trim().to_string())),
            [task] => Ok(task.id.clone()),
            many => Err(Error::InvalidArgument(format!(
                "ambiguous task id '{}': {}",
                input.trim(),
                many.iter()
                    .map(|task| task.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    /// Replace the in-memory list with what storage holds now. Whoever saved
    /// last wins; nothing is merged. Returns whether the list changed.
    pub fn reload(&mut self) -> bool {
        let loaded = self.persistence.load();
        let changed = loaded != self.tasks;
        self.tasks = loaded;
        self.revision += 1;
        tracing::debug!(changed, count = self.tasks.len(), "task store reloaded");
        changed
    }

    /// Save the current list, e.g. on teardown
    pub fn flush(&mut self) {
        self.persist();
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Ulid::new().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn commit(&mut self) {
        self.revision += 1;
        self.persist();
    }

    fn persist(&mut self) {
        match self.persistence.save(&self.tasks) {
            Ok(()) => self.last_persist_error = None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to save tasks; keeping in-memory state");
                self.last_persist_error = Some(err.to_string());
            }
        }
    }
}
