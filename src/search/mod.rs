//! Embeddings and the vector index behind semantic recall

pub mod builder;
pub mod embedder;
pub mod embedding;
pub mod vector_index;

pub use builder::{build_artifact, build_index_file, BuildOutcome};
pub use embedder::{create_embedder, Embedder, HtpEmbedder, Model2VecEmbedder, SearchConfig};
pub use embedding::EmbeddingModel;
pub use vector_index::{IndexArtifact, SearchHits, VectorIndex, NO_RESULT};
