//! Memory and goal records
//!
//! Both record kinds are retrieved through the [`Entry`] trait, which exposes
//! text fields by name so the retrievers and the prompt formatter can work on
//! either store with the same field selection.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Field used for memory retrieval
pub const MEMORY_FIELD: &str = "summary";
/// Fields used for goal retrieval (joined for matching, `name: description` when rendered)
pub const GOAL_FIELDS: [&str; 2] = ["name", "description"];

/// A record that can be retrieved by text field name
pub trait Entry {
    /// Value of a named text field; `None` for unknown fields
    fn field(&self, name: &str) -> Option<&str>;
}

/// One recorded interaction with the companion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub user_input: String,
    #[serde(default)]
    pub assistant_reply: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub themes: Vec<String>,
}

impl MemoryEntry {
    /// New entry stamped with the current UTC time
    pub fn new(user_input: &str, assistant_reply: &str, summary: &str) -> Self {
        Self {
            timestamp: utc_timestamp(),
            user_input: user_input.to_string(),
            assistant_reply: assistant_reply.to_string(),
            summary: summary.to_string(),
            themes: Vec::new(),
        }
    }

    /// Entry with only a summary, as found in hand-written fixtures
    pub fn from_summary(summary: &str) -> Self {
        Self {
            timestamp: String::new(),
            user_input: String::new(),
            assistant_reply: String::new(),
            summary: summary.to_string(),
            themes: Vec::new(),
        }
    }
}

impl Entry for MemoryEntry {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "timestamp" => Some(&self.timestamp),
            "user_input" => Some(&self.user_input),
            "assistant_reply" => Some(&self.assistant_reply),
            "summary" => Some(&self.summary),
            _ => None,
        }
    }
}

/// A stated goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl GoalEntry {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

impl Entry for GoalEntry {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(&self.name),
            "description" => Some(&self.description),
            _ => None,
        }
    }
}

/// Which fields of an entry take part in matching and rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextFields {
    Single(String),
    Multiple(Vec<String>),
}

impl TextFields {
    /// Fields used for memory entries
    pub fn memory() -> Self {
        Self::Single(MEMORY_FIELD.to_string())
    }

    /// Fields used for goal entries
    pub fn goals() -> Self {
        Self::Multiple(GOAL_FIELDS.iter().map(|f| f.to_string()).collect())
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::Multiple(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Text used for matching and embedding.
    ///
    /// Multiple fields are space-joined with a trailing separator after each
    /// value; unknown fields contribute an empty string.
    pub fn joined_text<E: Entry + ?Sized>(&self, entry: &E) -> String {
        match self {
            Self::Single(name) => entry.field(name).unwrap_or("").to_string(),
            Self::Multiple(names) => {
                let mut text = String::new();
                for name in names {
                    text.push_str(entry.field(name).unwrap_or(""));
                    text.push(' ');
                }
                text
            }
        }
    }
}

impl From<&str> for TextFields {
    fn from(name: &str) -> Self {
        Self::Single(name.to_string())
    }
}

impl From<&[&str]> for TextFields {
    fn from(names: &[&str]) -> Self {
        Self::Multiple(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TextFields {
    fn from(names: [&str; N]) -> Self {
        Self::Multiple(names.iter().map(|n| n.to_string()).collect())
    }
}

/// ISO-8601 UTC timestamp with microseconds and a `Z` suffix
pub fn utc_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_entry_fields() {
        let entry = MemoryEntry::new("hello", "hi there", "greeting");
        assert_eq!(entry.field("summary"), Some("greeting"));
        assert_eq!(entry.field("user_input"), Some("hello"));
        assert_eq!(entry.field("mood"), None);
        assert!(entry.themes.is_empty());
        assert!(entry.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_joined_text() {
        let goal = GoalEntry::new("Launch AI MVP prototype", "Build the first version.");
        let text = TextFields::goals().joined_text(&goal);
        assert_eq!(text, "Launch AI MVP prototype Build the first version. ");

        let memory = MemoryEntry::from_summary("Art project");
        assert_eq!(TextFields::memory().joined_text(&memory), "Art project");
        assert_eq!(TextFields::from("missing").joined_text(&memory), "");
    }

    #[test]
    fn test_partial_record_deserializes() {
        let json = r#"{"timestamp": "2025-07-18T01:00:00Z", "summary": "Felt grateful"}"#;
        let entry: MemoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.summary, "Felt grateful");
        assert_eq!(entry.user_input, "");
    }
}
