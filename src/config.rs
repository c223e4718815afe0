//! Workspace configuration
//!
//! Loads settings from a YAML file (`config.yml` by default). Values of the
//! form `${VAR}` are taken from the environment.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";
/// Fixed path the client is opened on while a command runs.
pub const DEFAULT_WORKING_PATH: &str = "./session.dat";
/// Number of messages `read` prints.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;
/// Telegram service notifications account.
pub const OFFICIAL_ACCOUNT_ID: i64 = 777000;

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlConfig {
    workspace: Option<WorkspaceConfig>,
    read: Option<ReadConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkspaceConfig {
    working_path: Option<String>,
    lock_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReadConfig {
    history_limit: Option<usize>,
}

/// Main configuration struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub working_path: PathBuf,
    pub lock_file: PathBuf,
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load the config for a CLI invocation.
    ///
    /// An explicitly requested file must exist; the default `config.yml` is
    /// optional and built-in defaults apply when it is missing.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load_from_file(DEFAULT_CONFIG_FILE)
            }
            None => Ok(Self::defaults()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a map.
        let yaml: YamlConfig = if content.trim().is_empty() {
            YamlConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };

        let workspace = yaml.workspace.unwrap_or_default();
        let read = yaml.read.unwrap_or_default();

        let working_path = resolve_env_string(workspace.working_path)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKING_PATH));
        let lock_file = resolve_env_string(workspace.lock_file)
            .map(PathBuf::from)
            .unwrap_or_else(|| lock_path_for(&working_path));

        let history_limit = read.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if history_limit == 0 {
            return Err(Error::ConfigError(
                "read.history_limit must be at least 1".to_string(),
            ));
        }
        if lock_file == working_path {
            return Err(Error::ConfigError(
                "workspace.lock_file must differ from workspace.working_path".to_string(),
            ));
        }

        Ok(Self {
            working_path,
            lock_file,
            history_limit,
        })
    }

    /// Built-in defaults
    fn defaults() -> Self {
        let working_path = PathBuf::from(DEFAULT_WORKING_PATH);
        Self {
            lock_file: lock_path_for(&working_path),
            working_path,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// `<working path>.lock`
pub fn lock_path_for(working_path: &Path) -> PathBuf {
    let mut name = working_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Resolve a value: if it looks like `${VAR}`, read VAR from the environment.
/// An unset variable yields `None` so the default applies.
fn resolve_env_string(value: Option<String>) -> Option<String> {
    let value = value?;
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        return std::env::var(var_name).ok().filter(|v| !v.is_empty());
    }
    Some(value)
}
