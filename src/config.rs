//! Optional `config.toml` living next to the task data.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::fields::{Assignees, DEFAULT_ASSIGNEES};
use crate::persist::DEFAULT_KEY;
use crate::validate::Rules;

pub const CONFIG_FILE: &str = "config.toml";

/// Settings read from `<data dir>/config.toml`. Every key is optional.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Key the task blob is stored under.
    pub storage_key: String,
    /// Allowed values for `assignedTo`.
    pub assignees: Vec<String>,
    /// Accept created/due times earlier than the moment of submission.
    pub allow_backdated: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_key: DEFAULT_KEY.to_string(),
            assignees: DEFAULT_ASSIGNEES.iter().map(|s| s.to_string()).collect(),
            allow_backdated: false,
        }
    }
}

impl Config {
    /// Read the config in `data_dir`, or defaults when there is none.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn rules(&self) -> Rules {
        Rules {
            assignees: Assignees::new(self.assignees.iter().cloned()),
            allow_backdated: self.allow_backdated,
        }
    }
}

/// `$HOME/.phased-tasks`, or `./.phased-tasks` without a home directory.
pub fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".phased-tasks")
}
