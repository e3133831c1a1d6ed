//! eatsy - Retrieval-augmented customer support answers
//!
//! This is the convenience wrapper crate that re-exports the eatsy
//! components.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! eatsy = "0.1"
//! ```
//!
//! ```no_run
//! use eatsy::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::resolve("config.yaml")?;
//! let provider = Arc::new(GeminiProvider::new(&config)?);
//! let pipeline = Pipeline::new(config, &SampleSource, provider).await?;
//!
//! let result = pipeline.answer_query("How can I get a discount?", "bm25").await?;
//! println!("{}", result.answer.text());
//! # Ok(())
//! # }
//! ```

// Re-export core
pub use eatsy_core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use eatsy_core::*;
    pub use eatsy_core::rag::{InMemorySource, JsonFileSource, SampleSource};
}
