//! Offline index construction from a full store snapshot
//!
//! The index is rebuilt from scratch every time. Ids are the entries'
//! positions in the snapshot, so an index stays valid for an append-only
//! store until it is rebuilt; entries appended after the build are simply
//! not searchable yet. Entries with no text to embed are left out of the
//! index so they never match.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::embedder::{is_blank, Embedder};
use super::vector_index::{IndexArtifact, VectorIndex};
use crate::core::entry::{Entry, TextFields};
use crate::core::store::{read_json_sequence, StoreRead};

/// Result of building one store index
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Built {
        vectors: usize,
        dimension: usize,
        duration_ms: u128,
    },
    SkippedMissing,
    SkippedMalformed(String),
    SkippedEmpty,
}

/// Embed every entry's joined fields and index them under their positions
pub fn build_artifact<T: Entry>(
    entries: &[T],
    fields: &TextFields,
    embedder: &dyn Embedder,
) -> Result<IndexArtifact> {
    let texts: Vec<String> = entries
        .iter()
        .map(|entry| fields.joined_text(entry).trim().to_string())
        .collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

    let vectors = embedder
        .embed_batch(&refs)
        .context("Failed to embed store entries")?;

    let (ids, vectors): (Vec<i64>, Vec<Vec<f32>>) = vectors
        .into_iter()
        .enumerate()
        .filter(|(_, vector)| !is_blank(vector))
        .map(|(position, vector)| (position as i64, vector))
        .unzip();
    if ids.len() < entries.len() {
        debug!(
            skipped = entries.len() - ids.len(),
            "entries without text left out of the index"
        );
    }
    let index = VectorIndex::build(embedder.dimension(), vectors, ids)?;

    Ok(IndexArtifact::new(embedder.name(), entries.len(), index))
}

/// Read a JSON store, build its index and write the artifact
pub fn build_index_file<T: Entry + DeserializeOwned>(
    store_path: &Path,
    index_path: &Path,
    fields: &TextFields,
    embedder: &dyn Embedder,
) -> Result<BuildOutcome> {
    let entries: Vec<T> = match read_json_sequence(store_path) {
        StoreRead::Loaded(entries) => entries,
        StoreRead::Missing => {
            info!(path = %store_path.display(), "store not found, skipping index build");
            return Ok(BuildOutcome::SkippedMissing);
        }
        StoreRead::Malformed(reason) => {
            warn!(path = %store_path.display(), %reason, "could not decode store, skipping index build");
            return Ok(BuildOutcome::SkippedMalformed(reason));
        }
    };

    if entries.is_empty() {
        info!(path = %store_path.display(), "store is empty, skipping index build");
        return Ok(BuildOutcome::SkippedEmpty);
    }

    let start = Instant::now();
    let artifact = build_artifact(&entries, fields, embedder)?;
    artifact
        .save(index_path)
        .with_context(|| format!("Failed to save index to {}", index_path.display()))?;

    let outcome = BuildOutcome::Built {
        vectors: artifact.index.len(),
        dimension: artifact.index.dimension(),
        duration_ms: start.elapsed().as_millis(),
    };
    info!(
        store = %store_path.display(),
        index = %index_path.display(),
        vectors = artifact.index.len(),
        "index written"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::{GoalEntry, MemoryEntry};
    use crate::search::embedder::HtpEmbedder;
    use tempfile::TempDir;

    #[test]
    fn test_build_artifact_ids_follow_positions() {
        let memories = vec![
            MemoryEntry::from_summary("Felt grateful for family support"),
            MemoryEntry::from_summary("Thinking about an art project"),
        ];
        let embedder = HtpEmbedder::new();
        let artifact = build_artifact(&memories, &TextFields::memory(), &embedder).unwrap();

        assert_eq!(artifact.index.ids(), &[0, 1]);
        assert_eq!(artifact.source_len, 2);
        assert_eq!(artifact.embedder, "htp-384");

        let query = embedder.embed("Thinking about an art project").unwrap();
        let hits = artifact.index.search(&query, 1).unwrap();
        assert_eq!(hits.ids, vec![1]);
        assert!(hits.distances[0] < 1e-6);
    }

    #[test]
    fn test_build_artifact_leaves_out_blank_entries() {
        let memories = vec![
            MemoryEntry::from_summary("Felt grateful for family support"),
            MemoryEntry::from_summary(""),
            MemoryEntry::from_summary("Thinking about an art project"),
        ];
        let artifact =
            build_artifact(&memories, &TextFields::memory(), &HtpEmbedder::new()).unwrap();

        assert_eq!(artifact.index.ids(), &[0, 2]);
        assert_eq!(artifact.source_len, 3);
    }

    #[test]
    fn test_build_index_file_skips() {
        let dir = TempDir::new().unwrap();
        let embedder = HtpEmbedder::new();
        let index_path = dir.path().join("goals_index.bin");

        let missing = build_index_file::<GoalEntry>(
            &dir.path().join("goals.json"),
            &index_path,
            &TextFields::goals(),
            &embedder,
        )
        .unwrap();
        assert_eq!(missing, BuildOutcome::SkippedMissing);

        let empty_path = dir.path().join("empty.json");
        std::fs::write(&empty_path, "[]").unwrap();
        let empty =
            build_index_file::<GoalEntry>(&empty_path, &index_path, &TextFields::goals(), &embedder)
                .unwrap();
        assert_eq!(empty, BuildOutcome::SkippedEmpty);

        let broken_path = dir.path().join("broken.json");
        std::fs::write(&broken_path, "[{").unwrap();
        let broken = build_index_file::<GoalEntry>(
            &broken_path,
            &index_path,
            &TextFields::goals(),
            &embedder,
        )
        .unwrap();
        assert!(matches!(broken, BuildOutcome::SkippedMalformed(_)));
        assert!(!index_path.exists());
    }

    #[test]
    fn test_build_index_file_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("goals.json");
        std::fs::write(
            &store_path,
            r#"[{"name": "Become proficient in Spanish", "description": "Reach CEFR Level C2."}]"#,
        )
        .unwrap();
        let index_path = dir.path().join("goals_index.bin");

        let outcome = build_index_file::<GoalEntry>(
            &store_path,
            &index_path,
            &TextFields::goals(),
            &HtpEmbedder::new(),
        )
        .unwrap();

        assert!(matches!(outcome, BuildOutcome::Built { vectors: 1, dimension: 384, .. }));
        let artifact = IndexArtifact::load(&index_path).unwrap();
        assert_eq!(artifact.source_len, 1);
    }
}
