//! eatsy-core - Retrieval-augmented support answers
//!
//! Provides the components behind the Eatsy support assistant:
//! - Document store and sources (built-in sample, JSON file, in-memory)
//! - Lexical (BM25) and semantic (embedding) retrieval behind one router
//! - Context assembly and prompt formatting
//! - Generation provider abstraction (Gemini REST API)
//! - Configuration management
//!
//! ## Primary API
//!
//! Most users should go through [`Pipeline::answer_query`].

// Public modules
pub mod config;
pub mod generation;
pub mod pipeline;
pub mod provider;
pub mod rag;

#[cfg(test)]
pub(crate) mod testing;

// Public exports
pub use config::{Config, ConfigError};
pub use generation::{build_prompt, GenerationInvoker, GenerationOutcome};
pub use pipeline::{Pipeline, QueryAnswer};
pub use rag::{Document, DocumentSource, RagError, RetrievalResult, SearchResult, Strategy};

// Provider exports
pub use provider::{GenerateRequest, GenerateResponse, GeminiProvider, Provider, ProviderError};
