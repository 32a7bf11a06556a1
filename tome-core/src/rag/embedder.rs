//! Embedding generation using embedding providers.
//!
//! This module wraps a provider with the vector dimension the knowledge
//! base was created with, so a misconfigured model cannot silently write
//! vectors of the wrong length.

use crate::provider::{EmbeddingProvider, ProviderError};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during embedding generation.
#[derive(Debug, Error)]
pub enum EmbedderError {
    /// The provider API returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The API response contained no embeddings.
    #[error("No embeddings returned")]
    NoEmbeddings,

    /// The provider's vectors do not have the configured length.
    #[error("Embedding dimension mismatch: configured {expected}, model '{model}' returned {actual}")]
    DimensionMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },
}

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedderError>;

const DIMENSION_PROBE: &str = "dimension probe";

/// Generates vector embeddings of a fixed, known dimension.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimension: usize) -> Self {
        Self {
            provider,
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Generates a vector embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The provider is unreachable or rejects the request
    /// - The provider returns no embeddings
    /// - The vector length differs from the configured dimension
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbedderError::NoEmbeddings)
    }

    /// Embeds several texts in one provider call, preserving order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.provider.embed(texts).await?;
        if vectors.is_empty() {
            return Err(EmbedderError::NoEmbeddings);
        }

        for vector in &vectors {
            self.check_dimension(vector.len())?;
        }

        Ok(vectors)
    }

    /// Embeds a short probe text and checks the provider's real output
    /// length against the configured dimension.
    pub async fn verify_dimension(&self) -> Result<()> {
        self.embed(DIMENSION_PROBE).await.map(|_| ())
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimension {
            return Err(EmbedderError::DimensionMismatch {
                model: self.provider.model().to_string(),
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}
