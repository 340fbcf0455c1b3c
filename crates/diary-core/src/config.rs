//! Persisted config (recently opened diaries) in the app data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_data;

const CONFIG_FILENAME: &str = "config.toml";

/// How many diaries the recent list remembers.
pub const MAX_RECENT_DIARIES: usize = 10;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Diary files opened recently, most recent first.
    #[serde(default)]
    pub recent_diaries: Vec<String>,
}

impl Config {
    /// Puts `path` at the front of the recent list, dropping older duplicates.
    pub fn remember_diary(&mut self, path: &str) {
        self.recent_diaries.retain(|p| p != path);
        self.recent_diaries.insert(0, path.to_string());
        self.recent_diaries.truncate(MAX_RECENT_DIARIES);
    }

    /// The diary to reopen on startup.
    pub fn last_diary(&self) -> Option<PathBuf> {
        self.recent_diaries
            .iter()
            .find(|s| !s.is_empty())
            .map(PathBuf::from)
    }
}

/// Where the config file lives, if the app data directory can be resolved.
pub fn config_path() -> Option<PathBuf> {
    app_data::app_data_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    load_config_from(&path)
}

/// Load config from an explicit file. Returns default config if missing or invalid.
pub fn load_config_from(path: &Path) -> Config {
    let Ok(s) = std::fs::read_to_string(path) else {
        return Config::default();
    };
    toml::from_str(&s).unwrap_or_default()
}

/// Save config to the app data directory.
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoDataDir)?;
    save_config_to(&path, config)
}

pub fn save_config_to(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(path, s).map_err(ConfigError::Write)
}

/// Recently opened diaries, most recent first.
pub fn recent_diaries() -> Vec<PathBuf> {
    load_config()
        .recent_diaries
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Record `path` as the most recently opened diary and persist it.
pub fn add_recent_diary(path: &Path) -> Result<(), ConfigError> {
    let path = path.canonicalize().map_err(ConfigError::Canonicalize)?;
    if !path.is_file() {
        return Err(ConfigError::NotAFile(path));
    }
    let mut config = load_config();
    config.remember_diary(&path.to_string_lossy());
    save_config(&config)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("not a file: {0}")]
    NotAFile(PathBuf),
}
