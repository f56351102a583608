//! Embedder trait and implementations for semantic recall
//!
//! Provides abstraction over different embedding models:
//! - HtpEmbedder: Harmonic Token Projection (built-in, no model file)
//! - Model2VecEmbedder: Neural network based (requires model download)

use anyhow::{Context, Result};
use model2vec::Model2Vec;
use std::path::Path;

use super::embedding::{EmbeddingModel, EMBEDDING_DIM};

/// Embedding model abstraction
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;

    /// Get model name/identifier
    fn name(&self) -> &str;
}

/// True for the all-zero embedding encoders give text with no content
pub fn is_blank(vector: &[f32]) -> bool {
    vector.iter().all(|v| *v == 0.0)
}

// ============================================================================
// HTP Embedder
// ============================================================================

/// HTP (Harmonic Token Projection) Embedder wrapper
pub struct HtpEmbedder {
    model: EmbeddingModel,
}

impl HtpEmbedder {
    pub fn new() -> Self {
        Self {
            model: EmbeddingModel::new(),
        }
    }
}

impl Default for HtpEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for HtpEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.model.embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.model.embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn name(&self) -> &str {
        "htp-384"
    }
}

// ============================================================================
// Model2Vec Embedder
// ============================================================================

/// Model2Vec based embedder
pub struct Model2VecEmbedder {
    model: Model2Vec,
    dimension: usize,
    name: String,
}

impl Model2VecEmbedder {
    /// Load model from local path
    pub fn from_path(path: &Path) -> Result<Self> {
        let model = Model2Vec::from_pretrained(path.to_string_lossy().as_ref(), None, None)
            .with_context(|| format!("Failed to load Model2Vec from: {}", path.display()))?;

        Self::probe(model)
    }

    /// Load model from HuggingFace Hub
    pub fn from_pretrained(model_id: &str) -> Result<Self> {
        let model = Model2Vec::from_pretrained(model_id, None, None)
            .with_context(|| format!("Failed to load Model2Vec: {}", model_id))?;

        Self::probe(model)
    }

    /// Models differ in width; learn it from one encoding
    fn probe(model: Model2Vec) -> Result<Self> {
        let probe = model
            .encode(&["probe"])
            .context("Failed to encode probe text")?;
        let dimension = probe.ncols();

        Ok(Self {
            model,
            dimension,
            name: format!("model2vec-{}", dimension),
        })
    }
}

impl Embedder for Model2VecEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text];
        let embeddings = self.model.encode(&texts).context("Failed to encode text")?;
        Ok(embeddings.row(0).to_vec())
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.model.encode(texts).context("Failed to encode texts")?;
        Ok(embeddings.rows().into_iter().map(|r| r.to_vec()).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Search configuration for embedder selection
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    pub use_advanced: bool,
    pub model_path: Option<String>,
    pub model_id: Option<String>,
}

/// Create embedder based on configuration
pub fn create_embedder(config: &SearchConfig) -> Result<Box<dyn Embedder>> {
    if !config.use_advanced {
        return Ok(Box::new(HtpEmbedder::new()));
    }

    let embedder = match (&config.model_path, &config.model_id) {
        (Some(path), _) => Model2VecEmbedder::from_path(Path::new(path))?,
        (None, Some(id)) => Model2VecEmbedder::from_pretrained(id)?,
        (None, None) => anyhow::bail!("Model path or model id required for advanced search"),
    };
    Ok(Box::new(embedder))
}
