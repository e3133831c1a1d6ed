//! Retrieval for the support assistant.
//!
//! This module turns a knowledge base into ranked passages for a query.
//!
//! # Architecture
//!
//! - [`DocumentStore`]: the ordered, immutable set of passages
//! - [`LexicalIndex`]: BM25 term matching over the store
//! - [`SemanticIndex`]: cosine similarity over provider embeddings
//! - [`Router`]: picks an index for a [`Strategy`]
//! - [`ContextAssembler`]: turns ranked results into a bounded prompt context
//!
//! # How It Works
//!
//! 1. **Indexing Phase** (once, at startup):
//!    - Documents are loaded from a [`DocumentSource`]
//!    - The lexical index computes term and document frequencies
//!    - The semantic index embeds every document in one batch
//!
//! 2. **Retrieval Phase** (per query):
//!    - The router resolves the strategy name or fails fast
//!    - The selected index scores the query and returns the top-k
//!
//! Scores from the two indexes live on different scales and are never mixed
//! in one ranking.

mod context;
mod embedder;
mod lexical;
mod router;
mod sample;
mod semantic;
mod source;
mod store;
mod types;

pub use context::{ContextAssembler, SOURCE_PREFIX, TRUNCATION_MARKER};
pub use embedder::{Embedder, EmbedderError};
pub use lexical::{tokenize, LexicalIndex};
pub use router::{Retrieve, Router, Strategy};
pub use sample::{sample_records, SampleSource};
pub use semantic::{cosine_similarity, SemanticIndex};
pub use source::{DocumentSource, InMemorySource, JsonFileSource, KnowledgeRecord};
pub use store::DocumentStore;
pub use types::{Document, RetrievalResult, SearchResult};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Embedder error: {0}")]
    Embedder(#[from] EmbedderError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to load documents: {0}")]
    Source(String),
}

impl RagError {
    /// Whether this error is the caller's fault rather than the system's.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, RagError::InvalidArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

pub(crate) fn check_top_k(top_k: usize) -> Result<()> {
    if top_k == 0 {
        return Err(RagError::InvalidArgument("top_k must be at least 1".into()));
    }
    Ok(())
}
