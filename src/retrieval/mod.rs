//! Context retrieval over memory and goal stores
//!
//! Two strategies share the [`Retriever`] contract:
//! - [`KeywordRetriever`]: stop-word filtered token overlap, newest matches first
//! - [`SemanticRetriever`]: nearest neighbors in a prebuilt vector index
//!
//! Both return positions into the store sequence; [`select`] maps them back
//! to entries.

pub mod keyword;
pub mod normalize;
pub mod semantic;

pub use keyword::{retrieve_keyword, KeywordRetriever};
pub use normalize::{normalize, normalize_text};
pub use semantic::{retrieve_semantic, similarity, IndexSource, SemanticRetriever};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::entry::{Entry, TextFields};
use crate::error::RetrievalError;

/// Default number of entries retrieved per source
pub const DEFAULT_MAX_RESULTS: usize = 2;
/// Default minimum similarity for semantic matches
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Retrieval strategy selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Token overlap, most recent matches (default)
    #[default]
    Keyword,
    /// Vector similarity against a prebuilt index
    Semantic,
}

impl RetrievalMode {
    /// Parse retrieval mode from string
    ///
    /// # Examples
    /// ```
    /// use recollect::retrieval::RetrievalMode;
    /// assert_eq!(RetrievalMode::from_str("semantic"), RetrievalMode::Semantic);
    /// assert_eq!(RetrievalMode::from_str("vector"), RetrievalMode::Semantic);
    /// assert_eq!(RetrievalMode::from_str("keyword"), RetrievalMode::Keyword);
    /// assert_eq!(RetrievalMode::from_str("unknown"), RetrievalMode::Keyword); // default
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "semantic" | "vector" => RetrievalMode::Semantic,
            _ => RetrievalMode::Keyword,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Keyword => "keyword",
            RetrievalMode::Semantic => "semantic",
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrieved entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Zero-based position in the store sequence
    pub position: usize,
    /// `1 / (1 + d)` for semantic matches
    pub similarity: Option<f32>,
}

/// A store snapshot as seen by a retriever
pub struct Corpus<'a> {
    entries: Vec<&'a dyn Entry>,
    fields: &'a TextFields,
    index: Option<&'a IndexSource>,
}

impl<'a> Corpus<'a> {
    pub fn new<E: Entry>(entries: &'a [E], fields: &'a TextFields) -> Self {
        Self {
            entries: entries.iter().map(|e| e as &dyn Entry).collect(),
            fields,
            index: None,
        }
    }

    /// Attach the vector index built from this store
    pub fn with_index(mut self, index: &'a IndexSource) -> Self {
        self.index = Some(index);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fields(&self) -> &TextFields {
        self.fields
    }

    pub fn index(&self) -> Option<&IndexSource> {
        self.index
    }

    /// Matching text of the entry at `position`
    pub fn text_at(&self, position: usize) -> String {
        self.entries
            .get(position)
            .map(|entry| self.fields.joined_text(*entry))
            .unwrap_or_default()
    }
}

/// A retrieval strategy
pub trait Retriever: Send + Sync {
    fn mode(&self) -> RetrievalMode;

    /// Up to `max_results` entries of `corpus` relevant to `query`
    fn retrieve(
        &self,
        query: &str,
        corpus: &Corpus<'_>,
        max_results: usize,
    ) -> Result<Vec<Match>, RetrievalError>;
}

/// Entries at the matched positions, in match order
pub fn select<'a, E>(entries: &'a [E], matches: &[Match]) -> Vec<&'a E> {
    matches
        .iter()
        .filter_map(|m| entries.get(m.position))
        .collect()
}
