use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A knowledge-base passage.
///
/// Documents are created once at startup and never mutated afterwards. The
/// metadata values are JSON values so that absent attributes (for example a
/// general FAQ entry with no restaurant) can be stored as `null`.
///
/// # Example
///
/// ```
/// # use eatsy_core::rag::Document;
/// let doc = Document::new("faq_020", "Refer a friend and get discounts.")
///     .with_metadata("category", "promo")
///     .with_metadata("restaurant_id", serde_json::Value::Null);
/// assert_eq!(doc.category(), Some("promo"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn category(&self) -> Option<&str> {
        self.metadata.get("category").and_then(Value::as_str)
    }

    pub fn restaurant_id(&self) -> Option<&str> {
        self.metadata.get("restaurant_id").and_then(Value::as_str)
    }
}

/// A retrieved document and its relevance score.
///
/// Scores are only comparable within one index: BM25 scores are unbounded
/// positive numbers, cosine similarities lie in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}

/// Ranked results, best first, never longer than the requested top-k.
pub type RetrievalResult = Vec<SearchResult>;

/// Sorts by descending score and keeps the first `top_k`.
///
/// The sort is stable, so callers that push candidates in insertion order get
/// ties broken by insertion order.
pub(crate) fn rank(mut results: Vec<SearchResult>, top_k: usize) -> RetrievalResult {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(top_k);
    results
}
