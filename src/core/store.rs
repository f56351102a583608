//! JSON/YAML stores for memories, goals and the constitution
//!
//! Reads never fail: a missing or unreadable store is reported as
//! [`StoreRead::Missing`] or [`StoreRead::Malformed`] so callers can log it
//! and carry on with no context.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::entry::{GoalEntry, MemoryEntry};

/// Outcome of reading a persisted sequence or document
#[derive(Debug, Clone, PartialEq)]
pub enum StoreRead<T> {
    Loaded(T),
    Missing,
    Malformed(String),
}

impl<T> StoreRead<T> {
    pub fn is_malformed(&self) -> bool {
        matches!(self, StoreRead::Malformed(_))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, StoreRead::Missing)
    }

    /// Loaded value, or `fallback` when missing or malformed
    pub fn unwrap_or(self, fallback: T) -> T {
        match self {
            StoreRead::Loaded(value) => value,
            _ => fallback,
        }
    }

    /// Log a malformed read against `path`; pass the outcome through
    pub fn logged(self, path: &Path) -> Self {
        match &self {
            StoreRead::Malformed(reason) => {
                warn!(path = %path.display(), %reason, "store is malformed, treating as empty")
            }
            StoreRead::Missing => debug!(path = %path.display(), "store not found"),
            StoreRead::Loaded(_) => {}
        }
        self
    }
}

impl<T: Default> StoreRead<T> {
    pub fn unwrap_or_default(self) -> T {
        self.unwrap_or(T::default())
    }
}

/// Read a JSON array of records
pub fn read_json_sequence<T: DeserializeOwned>(path: &Path) -> StoreRead<Vec<T>> {
    if !path.exists() {
        return StoreRead::Missing;
    }
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<Vec<T>>(&content) {
            Ok(items) => StoreRead::Loaded(items),
            Err(e) => StoreRead::Malformed(e.to_string()),
        },
        Err(e) => StoreRead::Malformed(e.to_string()),
    }
}

/// Read a YAML document as an untyped value
pub fn read_yaml_document(path: &Path) -> StoreRead<serde_yaml::Value> {
    if !path.exists() {
        return StoreRead::Missing;
    }
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<serde_yaml::Value>(&content) {
            Ok(doc) => StoreRead::Loaded(doc),
            Err(e) => StoreRead::Malformed(e.to_string()),
        },
        Err(e) => StoreRead::Malformed(e.to_string()),
    }
}

/// Write a sequence as pretty JSON (2-space indent), replacing the file
pub fn write_json_sequence<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let content = serde_json::to_string_pretty(items)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Append-only log of interactions, rewritten in full on each append
#[derive(Debug, Clone)]
pub struct MemoryStore {
    path: PathBuf,
}

impl MemoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> StoreRead<Vec<MemoryEntry>> {
        read_json_sequence(&self.path).logged(&self.path)
    }

    /// Load all entries, oldest first; empty when missing or malformed
    pub fn load(&self) -> Vec<MemoryEntry> {
        self.read().unwrap_or_default()
    }

    /// Append one entry and rewrite the store.
    ///
    /// A malformed store is replaced by a store holding only the new entry.
    pub fn append(&self, entry: MemoryEntry) -> Result<()> {
        let mut memories = self.load();
        memories.push(entry);
        write_json_sequence(&self.path, &memories)?;
        debug!(path = %self.path.display(), count = memories.len(), "memory appended");
        Ok(())
    }
}

/// Read-only list of goals
#[derive(Debug, Clone)]
pub struct GoalStore {
    path: PathBuf,
}

impl GoalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> StoreRead<Vec<GoalEntry>> {
        read_json_sequence(&self.path).logged(&self.path)
    }

    pub fn load(&self) -> Vec<GoalEntry> {
        self.read().unwrap_or_default()
    }
}

/// Persona principles injected verbatim into every prompt
#[derive(Debug, Clone, PartialEq)]
pub struct Constitution {
    doc: serde_yaml::Value,
}

impl Default for Constitution {
    fn default() -> Self {
        Self {
            doc: serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
        }
    }
}

impl Constitution {
    pub fn from_value(doc: serde_yaml::Value) -> Self {
        Self { doc }
    }

    /// Load from YAML; missing or malformed documents become an empty mapping
    pub fn load(path: &Path) -> Self {
        match read_yaml_document(path).logged(path) {
            StoreRead::Loaded(doc) => Self { doc },
            _ => Self::default(),
        }
    }

    pub fn value(&self) -> &serde_yaml::Value {
        &self.doc
    }

    pub fn is_empty(&self) -> bool {
        match &self.doc {
            serde_yaml::Value::Mapping(m) => m.is_empty(),
            serde_yaml::Value::Null => true,
            _ => false,
        }
    }

    /// Pretty JSON rendering (2-space indent) for the prompt
    pub fn to_prompt_json(&self) -> String {
        match serde_json::to_string_pretty(&self.doc) {
            Ok(json) => json,
            Err(e) => {
                // Mappings with non-string keys cannot become JSON objects.
                warn!(error = %e, "constitution is not JSON-representable, using YAML text");
                serde_yaml::to_string(&self.doc).unwrap_or_default()
            }
        }
    }
}
