//! Embedding generation using backend providers.
//!
//! This module provides functionality to convert text into vector embeddings
//! using a provider's embedding model, and rejects vectors that could not be
//! compared against each other.

use crate::provider::{Provider, ProviderError};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during embedding generation.
#[derive(Debug, Error)]
pub enum EmbedderError {
    /// The provider API returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The API response contained no embeddings, or an empty vector.
    #[error("No embeddings returned")]
    NoEmbeddings,

    /// The provider returned a different number of vectors than inputs.
    #[error("Expected {expected} embeddings, received {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// Two vectors from the same model disagree on their length.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A vector contained NaN or infinity.
    #[error("Embedding contains non-finite values")]
    NonFinite,
}

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedderError>;

/// Generates vector embeddings for text using a fixed embedding model.
///
/// The same `Embedder` is used to embed the documents at build time and the
/// queries at search time, which guarantees both go through the same model.
///
/// # Supported Models
///
/// Common embedding models:
/// - `gemini-embedding-001` - 3072-dimensional embeddings (default)
/// - `text-embedding-004` - 768-dimensional embeddings
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl Embedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generates a vector embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The provider is unreachable or rejects the request
    /// - The provider returns an empty vector
    /// - The vector contains non-finite values
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.provider.embed(text, &self.model).await?;
        check_vector(&embedding)?;
        Ok(embedding)
    }

    /// Generates one embedding per text, all of the same dimension.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.provider.embed_batch(texts, &self.model).await?;

        if embeddings.len() != texts.len() {
            return Err(EmbedderError::CountMismatch {
                expected: texts.len(),
                actual: embeddings.len(),
            });
        }

        let mut dimension = None;
        for embedding in &embeddings {
            check_vector(embedding)?;
            let expected = *dimension.get_or_insert(embedding.len());
            if embedding.len() != expected {
                return Err(EmbedderError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }
}

fn check_vector(embedding: &[f32]) -> Result<()> {
    if embedding.is_empty() {
        return Err(EmbedderError::NoEmbeddings);
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(EmbedderError::NonFinite);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeProvider;

    #[tokio::test]
    async fn test_embed_uses_configured_model() {
        let provider = Arc::new(FakeProvider::new());
        let embedder = Embedder::new(provider.clone(), "fake-embed");

        let embedding = embedder.embed("vegan burger").await.unwrap();
        assert_eq!(embedding.len(), FakeProvider::DIMENSION);
        assert_eq!(provider.embedded_models(), vec!["fake-embed".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_vector_rejected() {
        let embedder = Embedder::new(Arc::new(FakeProvider::new().with_empty_embeddings()), "m");
        assert!(matches!(embedder.embed("x").await, Err(EmbedderError::NoEmbeddings)));
    }

    #[tokio::test]
    async fn test_batch_dimension_mismatch() {
        let provider = FakeProvider::new().with_short_embedding_after(1);
        let embedder = Embedder::new(Arc::new(provider), "m");

        let err = embedder.embed_batch(&["a", "b", "c"]).await.unwrap_err();
        assert!(matches!(err, EmbedderError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let embedder = Embedder::new(Arc::new(FakeProvider::new().with_failing_embeddings()), "m");
        assert!(matches!(embedder.embed_batch(&["a"]).await, Err(EmbedderError::Provider(_))));
    }
}
