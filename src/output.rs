//! Command results, rendered as a `kanban.v1` JSON envelope or a short
//! plain-text report.
//!
//! Success envelope:
//! `{schema_version, command, status: "success", board, data, warnings?, hint?}`
//! where `board` holds the per-column task counts after the command ran.
//! Error envelope:
//! `{schema_version, command, status: "error", error: {message, code, kind, details?}, hint?}`

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};
use crate::task::{StatusCounts, TaskStore, DESCRIPTION_MAX_LEN, TITLE_MAX_LEN};

pub const SCHEMA_VERSION: &str = "kanban.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

impl OutputOptions {
    pub fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }
}

/// Plain-text side of a command result
#[derive(Debug, Clone, Default)]
pub struct Report {
    title: String,
    fields: Vec<(&'static str, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
    hint: Option<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// `label: value` row under the title
    pub fn field(&mut self, label: &'static str, value: impl Into<String>) {
        self.fields.push((label, value.into()));
    }

    /// Free-form body line, printed as given after the fields
    pub fn line(&mut self, value: impl Into<String>) {
        self.lines.push(value.into());
    }

    pub fn warn(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    /// Command worth running next
    pub fn hint(&mut self, value: impl Into<String>) {
        self.hint = Some(value.into());
    }

    pub fn render(&self) -> String {
        let mut out = self.title.clone();
        for (label, value) in &self.fields {
            out.push_str(&format!("\n  {label}: {value}"));
        }
        if !self.lines.is_empty() {
            out.push('\n');
            for line in &self.lines {
                out.push('\n');
                out.push_str(line);
            }
        }
        for warning in &self.warnings {
            out.push_str(&format!("\nwarning: {warning}"));
        }
        if let Some(hint) = &self.hint {
            out.push_str(&format!("\nhint: {hint}"));
        }
        out
    }
}

#[derive(Serialize)]
struct SuccessEnvelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    board: StatusCounts,
    data: &'a T,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    error: ErrorBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
}

/// Print a finished command: the JSON envelope, the report, or nothing
/// under `--quiet`
pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    store: &TaskStore,
    data: &T,
    report: &Report,
) -> Result<()> {
    if options.json {
        let envelope = SuccessEnvelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            board: store.counts(),
            data,
            warnings: &report.warnings,
            hint: report.hint.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else if !options.quiet {
        println!("{}", report.render());
    }
    Ok(())
}

/// Report a failed command. JSON goes to stdout so scripts read one stream;
/// plain text goes to stderr.
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = error_hint(err);
    if json {
        let message = err.to_string();
        let envelope = ErrorEnvelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: &message,
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            },
            hint: hint.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// First positional argument, or `board` when none is given
pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

fn command_name_from(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if matches!(arg.as_str(), "--data-dir" | "--config") {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return arg;
    }
    "board".to_string()
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        exit_codes::USER_ERROR => "user_error",
        _ => "operation_failed",
    }
}

fn error_hint(err: &Error) -> Option<String> {
    match err {
        Error::TaskNotFound(_) => Some("kanban list".to_string()),
        Error::InvalidConfig(_) => Some("fix kanban.toml then retry".to_string()),
        Error::LockFailed(_) => Some("another kanban process is writing; retry shortly".to_string()),
        Error::Validation(_) => Some(format!(
            "titles must be 1-{TITLE_MAX_LEN} characters, descriptions at most {DESCRIPTION_MAX_LEN}"
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn command_name_skips_global_options() {
        assert_eq!(command_name_from(args(&[])), "board");
        assert_eq!(command_name_from(args(&["--json", "list"])), "list");
        assert_eq!(
            command_name_from(args(&["--data-dir", "/tmp/x", "add", "title"])),
            "add"
        );
    }

    #[test]
    fn report_renders_fields_body_and_hint() {
        let mut report = Report::new("Tasks");
        report.field("Total", "1");
        report.line("To Do (1)");
        report.line("  01ABC  Write docs");
        report.warn("storage is not writable");
        report.hint("kanban add \"<title>\"");

        assert_eq!(
            report.render(),
            "Tasks\n  Total: 1\n\nTo Do (1)\n  01ABC  Write docs\n\
             warning: storage is not writable\nhint: kanban add \"<title>\""
        );
        assert_eq!(Report::new("Task deleted").render(), "Task deleted");
    }

    #[test]
    fn success_envelope_carries_board_counts() {
        let mut store = TaskStore::in_memory();
        store.create("A", "").unwrap();
        let report = Report::new("Tasks");
        let envelope = SuccessEnvelope {
            schema_version: SCHEMA_VERSION,
            command: "list",
            status: "success",
            board: store.counts(),
            data: &serde_json::json!({"total": 1}),
            warnings: &report.warnings,
            hint: report.hint.as_deref(),
        };

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["board"]["todo"], 1);
        assert_eq!(value["board"]["done"], 0);
        assert!(value.get("warnings").is_none());
        assert!(value.get("hint").is_none());
    }

    #[test]
    fn errors_map_to_kind_and_hint() {
        let missing = Error::TaskNotFound("x".to_string());
        assert_eq!(error_kind(&missing), "user_error");
        assert_eq!(error_hint(&missing).as_deref(), Some("kanban list"));

        let invalid = Error::Validation(ValidationError::EmptyTitle);
        assert!(error_hint(&invalid).is_some_and(|hint| hint.contains("1-100")));
    }
}
