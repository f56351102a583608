//! Flat nearest-neighbor index over fixed-dimension embeddings
//!
//! Each vector is stored under the caller-assigned integer id. For store
//! indexes that id is the entry's zero-based position in the store snapshot
//! the index was built from. Search is an exhaustive scan over squared L2
//! distance, which is exact and fast enough for a few thousand entries.
//!
//! The on-disk artifact is a bincode blob of [`IndexArtifact`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::IndexError;

/// Id reported for a result slot with no neighbor
pub const NO_RESULT: i64 = -1;

/// Current artifact layout version
pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: usize,
    ids: Vec<i64>,
    vectors: Vec<Vec<f32>>,
}

/// Ids and distances of a search, nearest first, padded with [`NO_RESULT`]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHits {
    pub ids: Vec<i64>,
    pub distances: Vec<f32>,
}

impl SearchHits {
    /// Real neighbors only, as (id, distance)
    pub fn neighbors(&self) -> impl Iterator<Item = (i64, f32)> + '_ {
        self.ids
            .iter()
            .zip(self.distances.iter())
            .filter(|(id, _)| **id != NO_RESULT)
            .map(|(id, d)| (*id, *d))
    }
}

impl VectorIndex {
    /// Empty index of the given dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ids: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Build from vectors and their ids
    pub fn build(
        dimension: usize,
        vectors: Vec<Vec<f32>>,
        ids: Vec<i64>,
    ) -> Result<Self, IndexError> {
        if vectors.len() != ids.len() {
            return Err(IndexError::LengthMismatch {
                ids: ids.len(),
                vectors: vectors.len(),
            });
        }

        let mut seen = HashSet::with_capacity(ids.len());
        for (id, vector) in ids.iter().zip(vectors.iter()) {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if *id == NO_RESULT || !seen.insert(*id) {
                return Err(IndexError::DuplicateId(*id));
            }
        }

        Ok(Self {
            dimension,
            ids,
            vectors,
        })
    }

    /// Build with ids `0..N-1` in vector order
    pub fn build_sequential(dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let ids = (0..vectors.len() as i64).collect();
        Self::build(dimension, vectors, ids)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// The `k` nearest vectors by squared L2 distance
    pub fn search(&self, query: &[f32], k: usize) -> Result<SearchHits, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(i64, f32)> = self
            .ids
            .iter()
            .zip(self.vectors.iter())
            .map(|(id, vector)| (*id, squared_l2(query, vector)))
            .collect();

        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        let mut ids = Vec::with_capacity(k);
        let mut distances = Vec::with_capacity(k);
        for (id, distance) in scored {
            ids.push(id);
            distances.push(distance);
        }
        while ids.len() < k {
            ids.push(NO_RESULT);
            distances.push(f32::INFINITY);
        }

        Ok(SearchHits { ids, distances })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Persisted index with the metadata needed to trust it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexArtifact {
    pub version: u32,
    /// Name of the embedder that produced the vectors
    pub embedder: String,
    /// Length of the source store when the index was built
    pub source_len: usize,
    /// Unix timestamp of the build
    pub built_at: i64,
    pub index: VectorIndex,
}

impl IndexArtifact {
    pub fn new(embedder: &str, source_len: usize, index: VectorIndex) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            embedder: embedder.to_string(),
            source_len,
            built_at: chrono::Utc::now().timestamp(),
            index,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let bytes = bincode::serialize(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| IndexError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
        }
        fs::write(path, bytes).map_err(|source| IndexError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = fs::read(path).map_err(|source| IndexError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: IndexArtifact = bincode::deserialize(&bytes)?;
        if artifact.version != ARTIFACT_VERSION {
            return Err(IndexError::Version {
                found: artifact.version,
                expected: ARTIFACT_VERSION,
            });
        }
        let dimension = artifact.index.dimension;
        if let Some(bad) = artifact
            .index
            .vectors
            .iter()
            .map(Vec::len)
            .find(|len| *len != dimension)
        {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: bad,
            });
        }
        Ok(artifact)
    }
}
