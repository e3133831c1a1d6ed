//! The document store: the single source of truth for both indexes.

use super::source::DocumentSource;
use super::types::Document;
use super::{RagError, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// An immutable, ordered collection of documents.
///
/// Insertion order is preserved and is what both indexes use to break score
/// ties. Cloning is cheap: the documents live behind an `Arc` and are shared
/// with every index built from the store.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: Arc<Vec<Document>>,
}

impl DocumentStore {
    /// Creates a store, rejecting empty passages and duplicate ids.
    pub fn new(documents: Vec<Document>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(documents.len());
        for doc in &documents {
            if doc.text.trim().is_empty() {
                return Err(RagError::Configuration(format!("document '{}' has empty text", doc.id)));
            }
            if !seen.insert(doc.id.as_str()) {
                return Err(RagError::Configuration(format!("duplicate document id '{}'", doc.id)));
            }
        }

        Ok(Self {
            documents: Arc::new(documents),
        })
    }

    /// Loads every document from `source`.
    pub async fn from_source(source: &dyn DocumentSource) -> Result<Self> {
        let documents = source.list_all().await?;
        let store = Self::new(documents)?;
        info!(documents = store.len(), source = source.name(), "Loaded document store");
        Ok(store)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, position: usize) -> Option<&Document> {
        self.documents.get(position)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
