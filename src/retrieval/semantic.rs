//! Vector retrieval against a prebuilt index
//!
//! The query is embedded with the same encoder that built the index, the
//! nearest neighbors are looked up, and each squared L2 distance `d` becomes
//! a similarity `1 / (1 + d)`. Neighbors below the threshold are dropped and
//! the rest are returned nearest first.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{select, Corpus, Match, RetrievalMode, Retriever, DEFAULT_THRESHOLD};
use crate::core::entry::Entry;
use crate::error::RetrievalError;
use crate::search::embedder::{is_blank, Embedder};
use crate::search::vector_index::{IndexArtifact, VectorIndex};

/// Where a vector index comes from
#[derive(Debug, Clone)]
pub enum IndexSource {
    /// A persisted artifact, read on use; a missing file means no matches
    Location(PathBuf),
    /// An artifact already in memory
    Loaded(Arc<IndexArtifact>),
}

impl IndexSource {
    pub fn location(path: impl Into<PathBuf>) -> Self {
        Self::Location(path.into())
    }

    /// Wrap a bare index; it is trusted to cover the whole store and any encoder
    pub fn from_index(index: VectorIndex) -> Self {
        let len = index.len();
        Self::Loaded(Arc::new(IndexArtifact::new("", len, index)))
    }

    /// Load a persisted artifact now so later queries skip the read.
    ///
    /// A missing file stays a `Location`, so the store can be indexed later.
    pub fn preload(path: &Path) -> Result<Self, RetrievalError> {
        if !path.exists() {
            return Ok(Self::Location(path.to_path_buf()));
        }
        let artifact = IndexArtifact::load(path)?;
        Ok(Self::Loaded(Arc::new(artifact)))
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// The artifact, or `None` if the location does not exist
    pub fn resolve(&self) -> Result<Option<Cow<'_, IndexArtifact>>, RetrievalError> {
        match self {
            Self::Loaded(artifact) => Ok(Some(Cow::Borrowed(artifact.as_ref()))),
            Self::Location(path) if !path.exists() => {
                debug!(path = %path.display(), "index not found");
                Ok(None)
            }
            Self::Location(path) => Ok(Some(Cow::Owned(IndexArtifact::load(path)?))),
        }
    }
}

impl From<IndexArtifact> for IndexSource {
    fn from(artifact: IndexArtifact) -> Self {
        Self::Loaded(Arc::new(artifact))
    }
}

/// Map a squared L2 distance to a similarity in `(0, 1]`
pub fn similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

/// Nearest-neighbor retriever
#[derive(Clone)]
pub struct SemanticRetriever {
    embedder: Arc<dyn Embedder>,
    threshold: f32,
}

impl SemanticRetriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Matches among the first `len` store positions, nearest first
    pub fn search(
        &self,
        query: &str,
        len: usize,
        index: &IndexSource,
        max_results: usize,
    ) -> Result<Vec<Match>, RetrievalError> {
        if len == 0 || max_results == 0 {
            return Ok(Vec::new());
        }

        let artifact = match index.resolve()? {
            Some(artifact) => artifact,
            None => return Ok(Vec::new()),
        };

        if !artifact.embedder.is_empty() && artifact.embedder != self.embedder.name() {
            return Err(RetrievalError::EncoderMismatch {
                index: artifact.embedder.clone(),
                encoder: self.embedder.name().to_string(),
            });
        }
        if artifact.source_len > len {
            return Err(RetrievalError::OutOfSync {
                indexed: artifact.source_len,
                available: len,
            });
        }
        if artifact.source_len < len {
            warn!(
                indexed = artifact.source_len,
                available = len,
                "index is older than the store; newer entries are not searchable until it is rebuilt"
            );
        }

        let vector = self.embedder.embed(query).map_err(RetrievalError::Encode)?;
        if is_blank(&vector) {
            debug!("query has no content to embed");
            return Ok(Vec::new());
        }
        let hits = artifact.index.search(&vector, max_results)?;

        let mut matches = Vec::with_capacity(max_results);
        for (id, distance) in hits.neighbors() {
            let score = similarity(distance);
            if score < self.threshold {
                continue;
            }
            let position = match usize::try_from(id) {
                Ok(position) if position < len => position,
                _ => {
                    debug!(id, len, "index id outside the store, skipping");
                    continue;
                }
            };
            matches.push(Match {
                position,
                similarity: Some(score),
            });
        }
        Ok(matches)
    }

    /// Entries nearest to `query` with similarity at or above the threshold
    pub fn retrieve_entries<'a, E: Entry>(
        &self,
        query: &str,
        entries: &'a [E],
        index: &IndexSource,
        max_results: usize,
    ) -> Result<Vec<&'a E>, RetrievalError> {
        let matches = self.search(query, entries.len(), index, max_results)?;
        Ok(select(entries, &matches))
    }
}

impl Retriever for SemanticRetriever {
    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Semantic
    }

    fn retrieve(
        &self,
        query: &str,
        corpus: &Corpus<'_>,
        max_results: usize,
    ) -> Result<Vec<Match>, RetrievalError> {
        if corpus.is_empty() {
            return Ok(Vec::new());
        }
        let index = corpus.index().ok_or(RetrievalError::MissingIndex)?;
        self.search(query, corpus.len(), index, max_results)
    }
}

/// Entries nearest to `query`, most similar first
pub fn retrieve_semantic<'a, E: Entry>(
    query: &str,
    entries: &'a [E],
    index: &IndexSource,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
    threshold: f32,
) -> Result<Vec<&'a E>, RetrievalError> {
    SemanticRetriever::new(embedder)
        .with_threshold(threshold)
        .retrieve_entries(query, entries, index, max_results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::{MemoryEntry, TextFields};
    use crate::search::builder::build_artifact;
    use crate::search::embedder::HtpEmbedder;
    use anyhow::Result;
    use tempfile::TempDir;

    /// Fixed two-dimensional vectors keyed by exact text
    struct TableEmbedder;

    impl Embedder for TableEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(match text {
                "origin" => vec![1.0, 0.0],
                "near" => vec![1.5, 0.0],
                "far" => vec![4.0, 0.0],
                _ => anyhow::bail!("no vector for '{}'", text),
            })
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "table-2"
        }
    }

    fn table_setup() -> (Vec<MemoryEntry>, IndexSource) {
        let entries = vec![
            MemoryEntry::from_summary("far"),
            MemoryEntry::from_summary("origin"),
            MemoryEntry::from_summary("near"),
        ];
        let artifact = build_artifact(&entries, &TextFields::memory(), &TableEmbedder).unwrap();
        (entries, artifact.into())
    }

    #[test]
    fn test_similarity_transform() {
        assert_eq!(similarity(0.0), 1.0);
        assert_eq!(similarity(1.0), 0.5);
        assert!(similarity(100.0) > 0.0);
        assert!(similarity(2.0) < similarity(1.0));
    }

    #[test]
    fn test_nearest_first_and_thresholded() {
        let (entries, index) = table_setup();
        let retriever = SemanticRetriever::new(Arc::new(TableEmbedder)).with_threshold(0.5);

        // origin: d=0 (s=1.0), near: d=0.25 (s=0.8), far: d=9 (s=0.1)
        let matches = retriever.search("origin", entries.len(), &index, 3).unwrap();
        let positions: Vec<usize> = matches.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![1, 2]);

        let scores: Vec<f32> = matches.iter().filter_map(|m| m.similarity).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert!(scores.iter().all(|s| *s >= 0.5));
    }

    #[test]
    fn test_max_results_limits_neighbors() {
        let (entries, index) = table_setup();
        let found = retrieve_semantic("origin", &entries, &index, Arc::new(TableEmbedder), 1, 0.0)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].summary, "origin");
    }

    #[test]
    fn test_empty_entries_skip_encoding() {
        let (_, index) = table_setup();
        let entries: Vec<MemoryEntry> = Vec::new();
        // The query has no vector, so reaching the encoder would fail
        let found =
            retrieve_semantic("unmapped", &entries, &index, Arc::new(TableEmbedder), 2, 0.5)
                .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_location_is_empty() {
        let dir = TempDir::new().unwrap();
        let entries = vec![MemoryEntry::from_summary("origin")];
        let index = IndexSource::location(dir.path().join("memory_index.bin"));
        let found =
            retrieve_semantic("origin", &entries, &index, Arc::new(TableEmbedder), 2, 0.5)
                .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_location_is_read_on_use() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory_index.bin");
        let (entries, index) = table_setup();
        if let IndexSource::Loaded(artifact) = &index {
            artifact.save(&path).unwrap();
        }

        let source = IndexSource::location(&path);
        let found = retrieve_semantic("near", &entries, &source, Arc::new(TableEmbedder), 1, 0.5)
            .unwrap();
        assert_eq!(found[0].summary, "near");
        assert!(IndexSource::preload(&path).unwrap().is_loaded());
    }

    #[test]
    fn test_store_shorter_than_index_is_rejected() {
        let (entries, index) = table_setup();
        let retriever = SemanticRetriever::new(Arc::new(TableEmbedder));
        let result = retriever.retrieve_entries("origin", &entries[..2], &index, 2);
        assert!(matches!(
            result,
            Err(RetrievalError::OutOfSync { indexed: 3, available: 2 })
        ));
    }

    #[test]
    fn test_store_longer_than_index_is_searched() {
        let (mut entries, index) = table_setup();
        entries.push(MemoryEntry::from_summary("origin"));
        let found = retrieve_semantic("origin", &entries, &index, Arc::new(TableEmbedder), 2, 0.5)
            .unwrap();
        // The appended duplicate is not indexed yet
        assert_eq!(found.len(), 2);
        assert!(std::ptr::eq(found[0], &entries[1]));
    }

    #[test]
    fn test_encoder_mismatch() {
        let (entries, index) = table_setup();
        let result = retrieve_semantic(
            "origin",
            &entries,
            &index,
            Arc::new(HtpEmbedder::new()),
            2,
            0.5,
        );
        assert!(matches!(result, Err(RetrievalError::EncoderMismatch { .. })));
    }

    #[test]
    fn test_encoder_failure_surfaces() {
        let (entries, index) = table_setup();
        let result =
            retrieve_semantic("unmapped", &entries, &index, Arc::new(TableEmbedder), 2, 0.5);
        assert!(matches!(result, Err(RetrievalError::Encode(_))));
    }

    #[test]
    fn test_bare_index_source() {
        let index =
            VectorIndex::build_sequential(2, vec![vec![1.0, 0.0], vec![1.5, 0.0]]).unwrap();
        let source = IndexSource::from_index(index);
        let entries = vec![
            MemoryEntry::from_summary("first"),
            MemoryEntry::from_summary("second"),
        ];
        let found =
            retrieve_semantic("near", &entries, &source, Arc::new(TableEmbedder), 2, 0.5).unwrap();
        let summaries: Vec<&str> = found.iter().map(|m| m.summary.as_str()).collect();
        assert_eq!(summaries, vec!["second", "first"]);
    }

    #[test]
    fn test_trait_requires_index() {
        let (entries, _) = table_setup();
        let fields = TextFields::memory();
        let corpus = Corpus::new(&entries, &fields);
        let retriever = SemanticRetriever::new(Arc::new(TableEmbedder));
        assert!(matches!(
            retriever.retrieve("origin", &corpus, 2),
            Err(RetrievalError::MissingIndex)
        ));
    }

    #[test]
    fn test_unrelated_query_below_threshold() {
        let entries = vec![
            MemoryEntry::from_summary("Felt grateful for family support"),
            MemoryEntry::from_summary("Thinking about an art project"),
            MemoryEntry::from_summary("Reflecting on the art project and fear of failure"),
        ];
        let embedder = HtpEmbedder::new();
        let index: IndexSource = build_artifact(&entries, &TextFields::memory(), &embedder)
            .unwrap()
            .into();

        let found = retrieve_semantic(
            "Boiling water for cooking pasta tonight",
            &entries,
            &index,
            Arc::new(HtpEmbedder::new()),
            2,
            0.6,
        )
        .unwrap();
        assert!(found.is_empty());

        let exact = retrieve_semantic(
            "Thinking about an art project",
            &entries,
            &index,
            Arc::new(HtpEmbedder::new()),
            1,
            0.6,
        )
        .unwrap();
        assert_eq!(exact[0].summary, "Thinking about an art project");
    }

    fn htp_index(entries: &[MemoryEntry]) -> IndexSource {
        build_artifact(entries, &TextFields::memory(), &HtpEmbedder::new())
            .unwrap()
            .into()
    }

    #[test]
    fn test_blank_entry_never_matches() {
        let entries = vec![
            MemoryEntry::from_summary("Felt grateful for family support"),
            MemoryEntry::from_summary(""),
        ];
        let index = htp_index(&entries);

        let found = retrieve_semantic(
            "Boiling water for cooking pasta tonight",
            &entries,
            &index,
            Arc::new(HtpEmbedder::new()),
            2,
            0.5,
        )
        .unwrap();
        assert!(found.iter().all(|m| !m.summary.is_empty()));
    }

    #[test]
    fn test_query_without_content_finds_nothing() {
        let entries = vec![
            MemoryEntry::from_summary("Felt grateful for family support"),
            MemoryEntry::from_summary("Thinking about an art project"),
        ];
        let index = htp_index(&entries);

        for query in ["?!...", "", "   "] {
            let found = retrieve_semantic(
                query,
                &entries,
                &index,
                Arc::new(HtpEmbedder::new()),
                2,
                0.0,
            )
            .unwrap();
            assert!(found.is_empty(), "query {:?} matched", query);
        }
    }
}
