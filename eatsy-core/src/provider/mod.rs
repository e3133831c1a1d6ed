//! Backend provider abstraction layer.
//!
//! This module defines the interface the pipeline uses to reach the two
//! external services it depends on: an embedding model and a generation
//! model. Both are served by the same provider in practice, so a single
//! trait covers them.

mod types;
pub mod gemini;

// Re-export common types
pub use types::{
    Candidate,
    Content,
    GenerateRequest,
    GenerateResponse,
    Part,
    PromptFeedback,
    Provider,
    ProviderError,
    Result,
};

// Re-export provider implementations
pub use gemini::GeminiProvider;
