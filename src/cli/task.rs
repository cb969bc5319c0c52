//! kanban task command implementations.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{self, Config, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use crate::output::{emit_success, OutputOptions, Report};
use crate::persistence::KeyValuePersistence;
use crate::projector::{BoardProjection, ColumnProjection};
use crate::storage::FileStore;
use crate::task::{MutationOutcome, StatusCounts, Task, TaskStatus, TaskStore};

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub status: Option<String>,
    pub search: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ShowOptions {
    pub id: String,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct StatusOptions {
    pub id: String,
    pub status: String,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct MoveOptions {
    pub id: String,
    pub status: String,
    /// Position within the column; negative or absent appends
    pub position: Option<i64>,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct RmOptions {
    pub id: String,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct CheckOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Resolved data directory, configuration and an open store
pub struct BoardContext {
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
    pub store: TaskStore,
}

impl BoardContext {
    pub fn value_path(&self) -> PathBuf {
        FileStore::new(&self.data_dir).value_path(&self.config.storage.key)
    }
}

/// Resolve the data directory, load `kanban.toml` and open the store.
///
/// An explicit `--config` path must exist; the default one may be absent.
pub fn load_context(data_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<BoardContext> {
    let data_dir = config::resolve_data_dir(data_dir.as_deref())?;
    let (config, config_path) = match config_path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::InvalidConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            (Config::load(&path)?, path)
        }
        None => (
            Config::load_from_dir(&data_dir)?,
            data_dir.join(CONFIG_FILE_NAME),
        ),
    };
    let store = open_store(&data_dir, &config);
    tracing::debug!(data_dir = %data_dir.display(), key = %config.storage.key, "board context loaded");
    Ok(BoardContext {
        data_dir,
        config_path,
        config,
        store,
    })
}

pub fn open_store(data_dir: &Path, config: &Config) -> TaskStore {
    TaskStore::open(KeyValuePersistence::with_key(
        FileStore::new(data_dir),
        config.storage.key.clone(),
    ))
}

#[derive(Serialize)]
struct TaskListOutput<'a> {
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
    columns: Vec<&'a ColumnProjection>,
}

#[derive(Serialize)]
struct TaskMovedOutput<'a> {
    task: &'a Task,
    position: usize,
    column_len: usize,
}

#[derive(Serialize)]
struct TaskRemovedOutput<'a> {
    id: &'a str,
    removed: bool,
}

#[derive(Serialize)]
struct CheckOutput {
    data_dir: PathBuf,
    config_path: PathBuf,
    config_present: bool,
    storage_key: String,
    storage_path: PathBuf,
    storage_present: bool,
    storage_available: bool,
    counts: StatusCounts,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut ctx = load_context(options.data_dir, options.config)?;
    let status = parse_status_arg(options.status.as_deref())?;

    let mut task = ctx
        .store
        .create(&options.title, options.description.as_deref().unwrap_or(""))?;
    if let Some(status) = status {
        require_applied(ctx.store.update_status(&task.id, status), &task.id)?;
        if let Some(updated) = ctx.store.get(&task.id) {
            task = updated.clone();
        }
    }
    ensure_persisted(&ctx.store)?;

    let mut report = Report::new("Task created");
    report.field("ID", task.id.clone());
    report.field("Title", task.title.clone());
    report.field("Status", task.status.label());

    emit_success(
        OutputOptions::new(options.json, options.quiet),
        "add",
        &ctx.store,
        &task,
        &report,
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(options.data_dir, options.config)?;
    let status = parse_status_arg(options.status.as_deref())?;

    let board = BoardProjection::project(&ctx.store, options.search.as_deref());
    let columns: Vec<&ColumnProjection> = board
        .columns
        .iter()
        .filter(|column| status.map_or(true, |status| column.status == status))
        .collect();
    let total: usize = columns.iter().map(|column| column.len()).sum();

    let mut report = Report::new("Tasks");
    report.field("Total", total.to_string());
    if let Some(filter) = board.filter.as_deref() {
        report.field("Filter", filter);
    }
    for column in &columns {
        report.line(format!("{} ({})", column.label(), column.len()));
        for card in &column.cards {
            report.line(format!(
                "  {}  {}",
                crate::task::short_id(&card.id),
                card.title
            ));
        }
    }
    if ctx.store.is_empty() {
        report.hint("kanban add \"<title>\"");
    }

    let output = TaskListOutput {
        total,
        filter: board.filter.as_deref(),
        columns,
    };

    emit_success(
        OutputOptions::new(options.json, options.quiet),
        "list",
        &ctx.store,
        &output,
        &report,
    )
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = load_context(options.data_dir, options.config)?;
    let id = ctx.store.resolve_id(&options.id)?;
    let task = ctx
        .store
        .get(&id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let mut report = Report::new(task.title.clone());
    report.field("ID", task.id.clone());
    report.field("Status", task.status.label());
    report.field("Created", task.created_at.to_rfc3339());
    report.field("Updated", task.updated_at.to_rfc3339());
    if !task.description.is_empty() {
        for line in task.description.lines() {
            report.line(line);
        }
    }

    emit_success(
        OutputOptions::new(options.json, options.quiet),
        "show",
        &ctx.store,
        task,
        &report,
    )
}

pub fn run_status(options: StatusOptions) -> Result<()> {
    let mut ctx = load_context(options.data_dir, options.config)?;
    let status: TaskStatus = options.status.parse()?;
    let id = ctx.store.resolve_id(&options.id)?;

    require_applied(ctx.store.update_status(&id, status), &id)?;
    ensure_persisted(&ctx.store)?;
    let task = ctx
        .store
        .get(&id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let mut report = Report::new("Task status updated");
    report.field("ID", task.id.clone());
    report.field("Status", task.status.label());

    emit_success(
        OutputOptions::new(options.json, options.quiet),
        "status",
        &ctx.store,
        task,
        &report,
    )
}

pub fn run_move(options: MoveOptions) -> Result<()> {
    let mut ctx = load_context(options.data_dir, options.config)?;
    let status: TaskStatus = options.status.parse()?;
    let id = ctx.store.resolve_id(&options.id)?;
    let position = position_arg(options.position);

    require_applied(ctx.store.move_to_position(&id, status, position), &id)?;
    ensure_persisted(&ctx.store)?;

    let column = ctx.store.by_status(status);
    let column_len = column.len();
    let index = column
        .iter()
        .position(|task| task.id == id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
    let task = column[index];

    let mut report = Report::new("Task moved");
    report.field("ID", task.id.clone());
    report.field("Status", task.status.label());
    report.field("Position", format!("{} of {}", index + 1, column_len));

    emit_success(
        OutputOptions::new(options.json, options.quiet),
        "move",
        &ctx.store,
        &TaskMovedOutput {
            task,
            position: index,
            column_len,
        },
        &report,
    )
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    if options.title.is_none() && options.description.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to edit: pass --title and/or --description".to_string(),
        ));
    }
    let mut ctx = load_context(options.data_dir, options.config)?;
    let id = ctx.store.resolve_id(&options.id)?;
    let current = ctx
        .store
        .get(&id)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let title = options.title.unwrap_or(current.title);
    let description = options.description.unwrap_or(current.description);
    require_applied(ctx.store.update(&id, &title, &description)?, &id)?;
    ensure_persisted(&ctx.store)?;
    let task = ctx
        .store
        .get(&id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let mut report = Report::new("Task updated");
    report.field("ID", task.id.clone());
    report.field("Title", task.title.clone());

    emit_success(
        OutputOptions::new(options.json, options.quiet),
        "edit",
        &ctx.store,
        task,
        &report,
    )
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let mut ctx = load_context(options.data_dir, options.config)?;
    let id = ctx.store.resolve_id(&options.id)?;

    require_applied(ctx.store.delete(&id), &id)?;
    ensure_persisted(&ctx.store)?;

    let mut report = Report::new("Task deleted");
    report.field("ID", id.clone());

    emit_success(
        OutputOptions::new(options.json, options.quiet),
        "rm",
        &ctx.store,
        &TaskRemovedOutput {
            id: &id,
            removed: true,
        },
        &report,
    )
}

pub fn run_check(options: CheckOptions) -> Result<()> {
    let mut ctx = load_context(options.data_dir, options.config)?;
    let storage_path = ctx.value_path();
    let storage_available = ctx.store.persistence_available();

    let output = CheckOutput {
        config_present: ctx.config_path.exists(),
        storage_present: storage_path.exists(),
        storage_key: ctx.config.storage.key.clone(),
        storage_available,
        counts: ctx.store.counts(),
        data_dir: ctx.data_dir.clone(),
        config_path: ctx.config_path.clone(),
        storage_path,
    };

    let mut report = Report::new("Board check");
    report.field("Data dir", output.data_dir.display().to_string());
    report.field(
        "Config",
        if output.config_present {
            output.config_path.display().to_string()
        } else {
            "defaults".to_string()
        },
    );
    report.field("Storage", output.storage_path.display().to_string());
    report.field(
        "Tasks",
        format!(
            "{} ({} to do, {} in progress, {} done)",
            output.counts.total(),
            output.counts.todo,
            output.counts.in_progress,
            output.counts.done
        ),
    );
    if !storage_available {
        report.warn("storage is not writable; changes will not be saved");
    }

    emit_success(
        OutputOptions::new(options.json, options.quiet),
        "check",
        &ctx.store,
        &output,
        &report,
    )
}

/// Signed CLI position to a store position; negative values append
pub fn position_arg(position: Option<i64>) -> usize {
    match position {
        Some(value) if value >= 0 => usize::try_from(value).unwrap_or(usize::MAX),
        _ => usize::MAX,
    }
}

fn parse_status_arg(raw: Option<&str>) -> Result<Option<TaskStatus>> {
    raw.map(str::parse).transpose()
}

fn require_applied(outcome: MutationOutcome, id: &str) -> Result<()> {
    match outcome {
        MutationOutcome::Applied => Ok(()),
        MutationOutcome::NotFound => Err(Error::TaskNotFound(id.to_string())),
    }
}

/// The store keeps going after a failed save; a one-shot command reports it
fn ensure_persisted(store: &TaskStore) -> Result<()> {
    match store.last_persist_error() {
        Some(message) => Err(Error::OperationFailed(format!(
            "change applied but not saved: {message}"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_and_missing_positions_append() {
        assert_eq!(position_arg(None), usize::MAX);
        assert_eq!(position_arg(Some(-1)), usize::MAX);
        assert_eq!(position_arg(Some(0)), 0);
        assert_eq!(position_arg(Some(3)), 3);
    }

    #[test]
    fn load_context_uses_configured_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[storage]\nkey = \"team\"",
        )
        .expect("write config");

        let mut ctx = load_context(Some(dir.path().to_path_buf()), None).expect("context");
        ctx.store.create("A", "").expect("create");
        assert!(dir.path().join("team.json").exists());
        assert_eq!(ctx.value_path(), dir.path().join("team.json"));
    }

    #[test]
    fn explicit_missing_config_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_context(
            Some(dir.path().to_path_buf()),
            Some(dir.path().join("nope.toml")),
        )
        .err()
        .expect("missing config");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
