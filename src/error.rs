//! Typed errors for the retrieval core
//!
//! Command and loader boundaries use `anyhow`; these enums are what the
//! library surfaces to callers that want to react to a specific failure.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the vector index and its on-disk artifact
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("vector dimension mismatch: index={expected}, vector={actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("ids and vectors differ in length: {ids} ids, {vectors} vectors")]
    LengthMismatch { ids: usize, vectors: usize },

    #[error("duplicate id {0} in index build")]
    DuplicateId(i64),

    #[error("failed to read index artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write index artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt index artifact: {0}")]
    Decode(#[from] bincode::Error),

    #[error("unsupported index artifact version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

/// Errors raised on the retrieval path
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("failed to encode query: {0}")]
    Encode(#[source] anyhow::Error),

    #[error("index built with encoder '{index}' but query encoder is '{encoder}'")]
    EncoderMismatch { index: String, encoder: String },

    #[error("index covers {indexed} entries but only {available} are available; rebuild the index")]
    OutOfSync { indexed: usize, available: usize },

    #[error("semantic retrieval requires a vector index")]
    MissingIndex,

    #[error(transparent)]
    Index(#[from] IndexError),
}
