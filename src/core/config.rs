//! recollect configuration module
//!
//! Config is read from `recollect.json` in the companion home directory.
//! Every field has a default, so partial files and missing files both work.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::retrieval::RetrievalMode;
use crate::search::embedder::SearchConfig;

pub const CONFIG_FILE_NAME: &str = "recollect.json";
pub const CONFIG_VERSION: u32 = 1;

/// Default Model2Vec model ID
pub const DEFAULT_MODEL2VEC_MODEL: &str = "minishlab/potion-base-8M";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub stores: StoresConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

/// Store locations, relative to the home directory unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoresConfig {
    #[serde(default = "default_memory")]
    pub memory: String,

    #[serde(default = "default_goals")]
    pub goals: String,

    #[serde(default = "default_constitution")]
    pub constitution: String,

    #[serde(default = "default_memory_index", rename = "memoryIndex")]
    pub memory_index: String,

    #[serde(default = "default_goals_index", rename = "goalsIndex")]
    pub goals_index: String,
}

fn default_memory() -> String {
    "memory/core_memory.json".to_string()
}

fn default_goals() -> String {
    "memory/goals.json".to_string()
}

fn default_constitution() -> String {
    "user_profile/constitution.yaml".to_string()
}

fn default_memory_index() -> String {
    "memory/memory_index.bin".to_string()
}

fn default_goals_index() -> String {
    "memory/goals_index.bin".to_string()
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            memory: default_memory(),
            goals: default_goals(),
            constitution: default_constitution(),
            memory_index: default_memory_index(),
            goals_index: default_goals_index(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub mode: RetrievalMode,

    #[serde(default = "default_max_results", rename = "maxResults")]
    pub max_results: usize,

    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

fn default_max_results() -> usize {
    2
}

fn default_threshold() -> f32 {
    0.5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            mode: RetrievalMode::default(),
            max_results: default_max_results(),
            threshold: default_threshold(),
        }
    }
}

/// Encoder selection for the semantic path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    #[serde(default, rename = "useAdvanced")]
    pub use_advanced: bool,

    #[serde(default, rename = "modelPath")]
    pub model_path: Option<String>,

    #[serde(default = "default_model_id", rename = "modelId")]
    pub model_id: String,
}

fn default_model_id() -> String {
    DEFAULT_MODEL2VEC_MODEL.to_string()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            use_advanced: false,
            model_path: None,
            model_id: default_model_id(),
        }
    }
}

impl EncoderConfig {
    /// Embedder settings with a relative model path resolved against `root`
    pub fn search_config(&self, root: &Path) -> SearchConfig {
        SearchConfig {
            use_advanced: self.use_advanced,
            model_path: self.model_path.as_ref().map(|p| {
                let path = Path::new(p);
                if path.is_absolute() {
                    p.clone()
                } else {
                    root.join(path).to_string_lossy().to_string()
                }
            }),
            model_id: Some(self.model_id.clone()),
        }
    }
}

/// External text generator; without a command the prompt preview is returned
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            stores: StoresConfig::default(),
            retrieval: RetrievalConfig::default(),
            encoder: EncoderConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            match Self::load_from_file(&config_path) {
                Ok(config) => {
                    if config.version > CONFIG_VERSION {
                        warn!(
                            found = config.version,
                            supported = CONFIG_VERSION,
                            "config version is newer than supported"
                        );
                    }
                    return config;
                }
                Err(e) => {
                    warn!(path = %config_path.display(), error = %e, "failed to load config, using defaults");
                }
            }
        }

        Self::default()
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        fs::create_dir_all(root)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(root.join(CONFIG_FILE_NAME), content)?;
        Ok(())
    }

    /// Get resolved paths based on home directory
    pub fn resolve_paths(&self, root: &Path) -> ResolvedPaths {
        let resolve = |p: &str| -> PathBuf {
            let path = Path::new(p);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            }
        };

        ResolvedPaths {
            root: root.to_path_buf(),
            memory: resolve(&self.stores.memory),
            goals: resolve(&self.stores.goals),
            constitution: resolve(&self.stores.constitution),
            memory_index: resolve(&self.stores.memory_index),
            goals_index: resolve(&self.stores.goals_index),
        }
    }
}

/// Resolved absolute paths for the companion home
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub root: PathBuf,
    pub memory: PathBuf,
    pub goals: PathBuf,
    pub constitution: PathBuf,
    pub memory_index: PathBuf,
    pub goals_index: PathBuf,
}
