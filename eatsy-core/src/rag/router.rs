//! Strategy selection.
//!
//! The set of retrieval strategies is closed: [`Strategy`] names every index
//! the router knows about and dispatch is an exhaustive `match`.

use super::lexical::LexicalIndex;
use super::semantic::SemanticIndex;
use super::types::RetrievalResult;
use super::{check_top_k, RagError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// The query capability shared by every index.
#[async_trait]
pub trait Retrieve: Send + Sync {
    fn strategy(&self) -> Strategy;

    /// Returns at most `top_k` documents ranked by descending score.
    async fn query(&self, text: &str, top_k: usize) -> Result<RetrievalResult>;
}

/// A retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// BM25 term matching.
    Lexical,
    /// Embedding similarity.
    Semantic,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Lexical, Strategy::Semantic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Lexical => "lexical",
            Strategy::Semantic => "semantic",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = RagError;

    /// Accepts `lexical`/`bm25` and `semantic`/`embedding`, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" | "bm25" => Ok(Strategy::Lexical),
            "semantic" | "embedding" => Ok(Strategy::Semantic),
            _ => Err(RagError::InvalidArgument(format!(
                "unknown retrieval strategy '{}' (expected one of: lexical, semantic)",
                s
            ))),
        }
    }
}

/// Routes queries to the index for the requested strategy.
///
/// The router shares the indexes, it does not build them. A router without a
/// semantic index rejects semantic queries with an invalid-argument error.
#[derive(Clone)]
pub struct Router {
    lexical: Arc<LexicalIndex>,
    semantic: Option<Arc<SemanticIndex>>,
}

impl Router {
    pub fn new(lexical: Arc<LexicalIndex>, semantic: Option<Arc<SemanticIndex>>) -> Self {
        Self { lexical, semantic }
    }

    /// Strategies this router can serve.
    pub fn strategies(&self) -> Vec<Strategy> {
        Strategy::ALL
            .into_iter()
            .filter(|s| self.index(*s).is_ok())
            .collect()
    }

    fn index(&self, strategy: Strategy) -> Result<&dyn Retrieve> {
        match strategy {
            Strategy::Lexical => Ok(self.lexical.as_ref()),
            Strategy::Semantic => self
                .semantic
                .as_deref()
                .map(|index| index as &dyn Retrieve)
                .ok_or_else(|| {
                    RagError::InvalidArgument("semantic retrieval is not enabled".into())
                }),
        }
    }

    /// Parses `strategy` and retrieves with it.
    ///
    /// Unknown strategy names and a zero `top_k` fail before any index (and
    /// so any external service) is touched.
    pub async fn retrieve(&self, query: &str, strategy: &str, top_k: usize) -> Result<RetrievalResult> {
        let strategy = strategy.parse()?;
        self.retrieve_with(strategy, query, top_k).await
    }

    pub async fn retrieve_with(&self, strategy: Strategy, query: &str, top_k: usize) -> Result<RetrievalResult> {
        check_top_k(top_k)?;
        let index = self.index(strategy)?;

        let results = index.query(query, top_k).await?;
        debug!(strategy = %index.strategy(), results = results.len(), "Retrieved documents");
        Ok(results)
    }
}
