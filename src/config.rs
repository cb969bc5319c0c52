//! Configuration loading and management
//!
//! Handles parsing of `kanban.toml` in the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::persistence::DEFAULT_STORAGE_KEY;

/// File name looked up inside the data directory
pub const CONFIG_FILE_NAME: &str = "kanban.toml";

const MIN_CARD_HEIGHT: u16 = 3;
const MAX_CARD_HEIGHT: u16 = 8;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Terminal board configuration
    #[serde(default)]
    pub board: BoardConfig,
}

/// Where the task list lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key the task list is stored under
    #[serde(default = "default_key")]
    pub key: String,
}

fn default_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { key: default_key() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Rows per card, borders included
    #[serde(default = "default_card_height")]
    pub card_height: u16,

    /// Reload when another process changes the data directory
    #[serde(default = "default_true")]
    pub watch: bool,
}

fn default_card_height() -> u16 {
    4
}

fn default_true() -> bool {
    true
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            card_height: default_card_height(),
            watch: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from a `kanban.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `kanban.toml` from the data directory, or return defaults when
    /// there is none
    pub fn load_from_dir(data_dir: &Path) -> crate::error::Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        self.storage.validate()?;
        self.board.validate()?;
        Ok(())
    }
}

impl StorageConfig {
    fn validate(&self) -> crate::error::Result<()> {
        crate::storage::validate_key(&self.key).map_err(|err| match err {
            crate::error::Error::InvalidArgument(message) => {
                crate::error::Error::InvalidConfig(format!("storage.key: {message}"))
            }
            other => other,
        })
    }
}

impl BoardConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if !(MIN_CARD_HEIGHT..=MAX_CARD_HEIGHT).contains(&self.card_height) {
            return Err(crate::error::Error::InvalidConfig(format!(
                "board.card_height must be between {MIN_CARD_HEIGHT} and {MAX_CARD_HEIGHT}, got {}",
                self.card_height
            )));
        }
        Ok(())
    }
}

/// Data directory: explicit override, else the platform data dir
pub fn resolve_data_dir(explicit: Option<&Path>) -> crate::error::Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    directories::ProjectDirs::from("", "", "kanban")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            crate::error::Error::InvalidConfig(
                "no home directory found; pass --data-dir or set KANBAN_DATA_DIR".to_string(),
            )
        })
}
