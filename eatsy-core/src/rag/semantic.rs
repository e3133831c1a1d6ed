//! Dense-embedding retrieval.
//!
//! Every document is embedded once when the index is built; each query is
//! embedded with the same [`Embedder`] and compared to every stored vector by
//! cosine similarity (a linear scan, which is plenty for a knowledge base of
//! this size).

use super::embedder::{Embedder, EmbedderError};
use super::router::Retrieve;
use super::store::DocumentStore;
use super::types::{rank, RetrievalResult, SearchResult};
use super::{check_top_k, RagError, Result, Strategy};
use async_trait::async_trait;
use tracing::{debug, info};

/// A read-only vector index over a [`DocumentStore`].
///
/// `embeddings[i]` is the vector of `store.get(i)`; all vectors share one
/// dimension.
#[derive(Clone)]
pub struct SemanticIndex {
    store: DocumentStore,
    embeddings: Vec<Vec<f32>>,
    dimension: usize,
    embedder: Embedder,
}

impl SemanticIndex {
    /// Embeds every document in one batched call and builds the index.
    ///
    /// # Errors
    ///
    /// Fails with [`RagError::Configuration`] if the store is empty or if the
    /// provider fails or returns malformed vectors. A partially embedded index
    /// is never returned.
    pub async fn build(store: DocumentStore, embedder: Embedder) -> Result<Self> {
        if store.is_empty() {
            return Err(RagError::Configuration(
                "cannot build a semantic index without documents".into(),
            ));
        }

        let texts: Vec<&str> = store.documents().iter().map(|d| d.text.as_str()).collect();
        info!(documents = texts.len(), model = embedder.model(), "Embedding documents");

        let embeddings = embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| RagError::Configuration(format!("failed to embed documents: {}", e)))?;

        let dimension = embeddings[0].len();
        info!(documents = store.len(), dimension, "Built semantic index");

        Ok(Self {
            store,
            embeddings,
            dimension,
            embedder,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Ranks documents against an already computed query vector.
    ///
    /// Documents with a similarity of exactly zero (orthogonal, or a zero
    /// vector on either side) are not returned.
    pub fn search_vector(&self, query_embedding: &[f32], top_k: usize) -> Result<RetrievalResult> {
        check_top_k(top_k)?;
        if query_embedding.len() != self.dimension {
            return Err(RagError::Embedder(EmbedderError::DimensionMismatch {
                expected: self.dimension,
                actual: query_embedding.len(),
            }));
        }

        let candidates: Vec<SearchResult> = self
            .store
            .documents()
            .iter()
            .zip(&self.embeddings)
            .filter_map(|(document, embedding)| {
                let score = cosine_similarity(query_embedding, embedding);
                (score != 0.0).then(|| SearchResult {
                    document: document.clone(),
                    score,
                })
            })
            .collect();

        Ok(rank(candidates, top_k))
    }

    /// Embeds `text` and returns the `top_k` most similar documents.
    pub async fn search(&self, text: &str, top_k: usize) -> Result<RetrievalResult> {
        check_top_k(top_k)?;

        let query_embedding = self.embedder.embed(text).await?;
        let results = self.search_vector(&query_embedding, top_k)?;

        debug!(query = %text, results = results.len(), "Semantic search");
        Ok(results)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl Retrieve for SemanticIndex {
    fn strategy(&self) -> Strategy {
        Strategy::Semantic
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<RetrievalResult> {
        self.search(text, top_k).await
    }
}

/// Computes cosine similarity between two vectors.
///
/// Returns values from -1.0 (opposite) to 1.0 (identical), with 0.0 indicating
/// orthogonal vectors. Returns 0.0 for mismatched lengths or zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    (dot_product / (magnitude_a * magnitude_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::sample::sample_records;
    use crate::rag::Document;
    use crate::testing::FakeProvider;
    use std::sync::Arc;

    fn store_of(texts: &[&str]) -> DocumentStore {
        DocumentStore::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, text)| Document::new(format!("doc_{}", i), *text))
                .collect(),
        )
        .unwrap()
    }

    fn embedder(provider: FakeProvider) -> Embedder {
        Embedder::new(Arc::new(provider), "fake-embed")
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &a), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]), -1.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_self_similarity_is_maximal() {
        let v = vec![0.3, -1.7, 2.2, 0.01];
        let w = vec![0.2, -1.5, 2.5, 0.3];
        let same = cosine_similarity(&v, &v);
        assert!((same - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&v, &w) <= same);
    }

    #[tokio::test]
    async fn test_build_and_search() {
        let docs = sample_records().into_iter().map(Document::from).collect();
        let store = DocumentStore::new(docs).unwrap();
        let index = SemanticIndex::build(store, embedder(FakeProvider::new())).await.unwrap();

        assert_eq!(index.len(), 20);
        assert_eq!(index.dimension(), FakeProvider::DIMENSION);

        let results = index.search("Refer a friend and get discounts.", 3).await.unwrap();
        assert_eq!(results[0].document.id, "faq_020");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_single_batched_build_call() {
        let provider = Arc::new(FakeProvider::new());
        let store = store_of(&["one", "two", "three"]);
        SemanticIndex::build(store, Embedder::new(provider.clone(), "fake-embed"))
            .await
            .unwrap();
        assert_eq!(provider.batch_calls(), 1);
    }

    #[tokio::test]
    async fn test_ties_broken_by_insertion_order() {
        let store = store_of(&["apple pie", "banana split", "apple pie"]);
        let index = SemanticIndex::build(store, embedder(FakeProvider::new())).await.unwrap();

        let results = index.search("apple pie", 3).await.unwrap();
        assert_eq!(results[0].document.id, "doc_0");
        assert_eq!(results[1].document.id, "doc_2");
        assert_eq!(results[0].score, results[1].score);
    }

    #[tokio::test]
    async fn test_top_k_bounds_results() {
        let store = store_of(&["vegan burger", "vegan sushi", "vegan smoothie"]);
        let index = SemanticIndex::build(store, embedder(FakeProvider::new())).await.unwrap();
        assert_eq!(index.search("vegan", 2).await.unwrap().len(), 2);
        assert!(matches!(index.search("vegan", 0).await, Err(RagError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_empty_store_is_a_configuration_error() {
        let result = SemanticIndex::build(store_of(&[]), embedder(FakeProvider::new())).await;
        assert!(matches!(result, Err(RagError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_provider_failure_fails_build() {
        let result = SemanticIndex::build(
            store_of(&["a", "b"]),
            embedder(FakeProvider::new().with_failing_embeddings()),
        )
        .await;
        assert!(matches!(result, Err(RagError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_inconsistent_dimensions_fail_build() {
        let result = SemanticIndex::build(
            store_of(&["a", "b", "c"]),
            embedder(FakeProvider::new().with_short_embedding_after(2)),
        )
        .await;
        assert!(matches!(result, Err(RagError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let index = SemanticIndex::build(store_of(&["a b", "c d"]), embedder(FakeProvider::new()))
            .await
            .unwrap();
        let err = index.search_vector(&[1.0, 2.0], 2).unwrap_err();
        assert!(matches!(
            err,
            RagError::Embedder(EmbedderError::DimensionMismatch { expected, actual: 2 }) if expected == FakeProvider::DIMENSION
        ));
    }
}
