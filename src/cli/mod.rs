//! Command-line interface for kanban
//!
//! This module defines the CLI structure using clap derive macros.
//! Task commands live in [`task`]; `board` opens the terminal UI.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

pub mod task;

/// kanban - a three-column task board
///
/// Run without a subcommand to open the interactive board. Tasks are kept
/// in a JSON document inside the data directory.
#[derive(Parser, Debug)]
#[command(name = "kanban")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the task list and kanban.toml
    #[arg(long, global = true, env = "KANBAN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to <data-dir>/kanban.toml)
    #[arg(long, global = true, env = "KANBAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the interactive board (default)
    Board,

    /// Create a task in To Do
    Add {
        /// Task title (1-100 characters)
        title: String,

        /// Task description (up to 500 characters)
        #[arg(short, long)]
        description: Option<String>,

        /// Column to place the new task in
        #[arg(short, long)]
        status: Option<String>,
    },

    /// List tasks by column
    #[command(alias = "ls")]
    List {
        /// Only this column: todo, in-progress, done
        #[arg(long)]
        status: Option<String>,

        /// Case-insensitive match on title or description
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show one task
    Show {
        /// Task id, or a unique prefix or suffix of one
        id: String,
    },

    /// Change a task's column without changing its place in the list
    Status {
        /// Task id, or a unique prefix or suffix of one
        id: String,

        /// New status: todo, in-progress, done
        status: String,
    },

    /// Move a task to a position within a column
    #[command(alias = "mv")]
    Move {
        /// Task id, or a unique prefix or suffix of one
        id: String,

        /// Target column: todo, in-progress, done
        status: String,

        /// Zero-based position in the column; negative or omitted appends
        #[arg(allow_negative_numbers = true)]
        position: Option<i64>,
    },

    /// Edit a task's title or description
    Edit {
        /// Task id, or a unique prefix or suffix of one
        id: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New description (pass "" to clear)
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a task
    #[command(alias = "delete")]
    Rm {
        /// Task id, or a unique prefix or suffix of one
        id: String,
    },

    /// Report data location, configuration and storage health
    Check,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let command = self.command.unwrap_or(Commands::Board);
        match command {
            Commands::Board => crate::ui::board::run(crate::ui::board::BoardOptions {
                data_dir: self.data_dir,
                config: self.config,
            }),
            Commands::Add {
                title,
                description,
                status,
            } => task::run_add(task::AddOptions {
                title,
                description,
                status,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::List { status, search } => task::run_list(task::ListOptions {
                status,
                search,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Show { id } => task::run_show(task::ShowOptions {
                id,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Status { id, status } => task::run_status(task::StatusOptions {
                id,
                status,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Move {
                id,
                status,
                position,
            } => task::run_move(task::MoveOptions {
                id,
                status,
                position,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Edit {
                id,
                title,
                description,
            } => task::run_edit(task::EditOptions {
                id,
                title,
                description,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Rm { id } => task::run_rm(task::RmOptions {
                id,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Check => task::run_check(task::CheckOptions {
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
        }
    }
}
