//! kanban - a three-column task board
//!
//! This library provides the core of the kanban CLI and terminal board:
//! an ordered task list with best-effort persistence, a drag-reorder
//! engine, and the projection that turns the list into three columns.
//!
//! # Core Concepts
//!
//! - **Task Store**: the single ordered list; column order is list order
//! - **Drag Engine**: turns pointer gestures into status and position changes
//! - **Persistence**: key-value storage of the whole list as one JSON document
//! - **Projection**: per-column views, filtered by a search term
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `kanban.toml`
//! - `drag`: Drag-and-drop state machine and insertion index
//! - `error`: Error types and result aliases
//! - `lock`: File locking and atomic writes
//! - `output`: Human and JSON command output
//! - `persistence`: Task list load/save over a key-value store
//! - `projector`: Column projections and change diffs
//! - `storage`: Key-value stores (files on disk, in memory)
//! - `task`: Task model and the task store
//! - `ui`: Interactive terminal board

pub mod cli;
pub mod config;
pub mod drag;
pub mod error;
pub mod lock;
pub mod output;
pub mod persistence;
pub mod projector;
pub mod storage;
pub mod task;
pub mod ui;

pub use error::{Error, Result};
