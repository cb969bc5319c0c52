#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway data directory for the kanban binary
pub struct TestBoard {
    dir: TempDir,
}

impl TestBoard {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.dir.path().join("kanban-tasks.json")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join("kanban.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_tasks_raw(&self, contents: &str) -> std::io::Result<()> {
        fs::write(self.tasks_path(), contents)
    }

    /// `kanban` pointed at this board
    pub fn cmd(&self) -> Command {
        let mut cmd = kanban_cmd();
        cmd.env("KANBAN_DATA_DIR", self.path());
        cmd
    }

    /// Saved task list, in stored order
    pub fn read_tasks(&self) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
        let raw = fs::read_to_string(self.tasks_path())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Titles of the saved tasks with `status`, in column order
    pub fn column_titles(&self, status: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        Ok(self
            .read_tasks()?
            .iter()
            .filter(|task| task["status"] == status)
            .filter_map(|task| task["title"].as_str().map(str::to_string))
            .collect())
    }

    /// Create a task and return its id
    pub fn add(&self, title: &str) -> Result<String, Box<dyn std::error::Error>> {
        let output = self.cmd().args(["--json", "add", title]).output()?;
        if !output.status.success() {
            return Err(format!(
                "add failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )
            .into());
        }
        let payload: Value = serde_json::from_slice(&output.stdout)?;
        payload["data"]["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| "missing id in add output".into())
    }

    /// Run with `--json` and parse the envelope
    pub fn json(&self, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self.cmd().arg("--json").args(args).output()?;
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

/// `kanban` with the environment cleared of user settings
pub fn kanban_cmd() -> Command {
    let mut cmd = Command::cargo_bin("kanban").expect("binary");
    cmd.env_remove("KANBAN_DATA_DIR")
        .env_remove("KANBAN_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}
