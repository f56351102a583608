//! Companion home directory management
//!
//! Handles home detection and store path resolution.

use std::path::PathBuf;
use tracing::warn;

use super::config::Config;

/// Environment variable for home directory configuration
pub const HOME_PATH_ENV: &str = "RECOLLECT_HOME";

/// Home paths wrapper that combines config and resolved paths
#[derive(Debug, Clone)]
pub struct HomePaths {
    pub root: PathBuf,
    pub memory: PathBuf,
    pub goals: PathBuf,
    pub constitution: PathBuf,
    pub memory_index: PathBuf,
    pub goals_index: PathBuf,
    pub config: Config,
}

impl HomePaths {
    /// Create HomePaths from environment variable or current directory.
    /// Loads config from the home root.
    pub fn new() -> Self {
        Self::from_root(get_home_root())
    }

    /// Create HomePaths from a specific root directory
    pub fn from_root(root: PathBuf) -> Self {
        let config = Config::load(&root);
        Self::from_root_with_config(root, config)
    }

    /// Create HomePaths with explicit config
    pub fn from_root_with_config(root: PathBuf, config: Config) -> Self {
        let resolved = config.resolve_paths(&root);

        Self {
            memory: resolved.memory,
            goals: resolved.goals,
            constitution: resolved.constitution,
            memory_index: resolved.memory_index,
            goals_index: resolved.goals_index,
            root,
            config,
        }
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }
}

impl Default for HomePaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Get home root path from environment variable or current directory.
/// Priority: RECOLLECT_HOME env var > current directory
pub fn get_home_root() -> PathBuf {
    if let Ok(path) = std::env::var(HOME_PATH_ENV) {
        let home = PathBuf::from(&path);
        if home.exists() {
            return home;
        }
        warn!(
            env = HOME_PATH_ENV,
            path = %path,
            "home path does not exist, falling back to current directory"
        );
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
