//! Error types for kanban
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (invalid input, unknown task, bad config)
//! - 4: Operation failed (storage, lock, serialization)
//!
//! Unknown task ids inside the store are not errors; see
//! [`crate::task::MutationOutcome`].

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the kanban CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Rejected task input. The operation that produced it left the board
/// untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title cannot be empty")]
    EmptyTitle,

    #[error("title is {len} characters, maximum is {max}")]
    TitleTooLong { len: usize, max: usize },

    #[error("description is {len} characters, maximum is {max}")]
    DescriptionTooLong { len: usize, max: usize },
}

impl ValidationError {
    /// Name of the form field the error belongs to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptyTitle | ValidationError::TitleTooLong { .. } => "title",
            ValidationError::DescriptionTooLong { .. } => "description",
        }
    }
}

/// Main error type for kanban operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_) => exit_codes::USER_ERROR,

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Validation(err) => Some(serde_json::json!({ "field": err.field() })),
            Error::TaskNotFound(id) => Some(serde_json::json!({ "id": id })),
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }
}

/// Result type alias for kanban operations
pub type Result<T> = std::result::Result<T, Error>;
