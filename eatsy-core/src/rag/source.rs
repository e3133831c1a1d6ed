//! Document sources.
//!
//! The pipeline never cares where its knowledge base comes from: anything
//! that can list its documents once at startup implements [`DocumentSource`].

use super::types::Document;
use super::{RagError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Supplies the ordered sequence of documents at startup.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Short human-readable name used in logs.
    fn name(&self) -> &str;

    /// Returns every document, in the order they should be indexed.
    async fn list_all(&self) -> Result<Vec<Document>>;
}

/// A raw knowledge-base record as it appears in a dataset file.
///
/// Only `id` and `text` are required; the remaining fields are optional and
/// carried into [`Document::metadata`], missing ones as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub restaurant_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub date_created: Option<String>,
}

impl From<KnowledgeRecord> for Document {
    fn from(record: KnowledgeRecord) -> Self {
        Document::new(record.id, record.text)
            .with_metadata("category", record.category.map_or(Value::Null, Value::String))
            .with_metadata("source", record.source.map_or(Value::Null, Value::String))
            .with_metadata("restaurant_id", record.restaurant_id.map_or(Value::Null, Value::String))
            .with_metadata("date_created", record.date_created.map_or(Value::Null, Value::String))
    }
}

/// A fixed list of documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    documents: Vec<Document>,
}

impl InMemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl DocumentSource for InMemorySource {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn list_all(&self) -> Result<Vec<Document>> {
        Ok(self.documents.clone())
    }
}

/// Reads a JSON array of [`KnowledgeRecord`]s from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    name: String,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();
        Self { path, name }
    }
}

#[async_trait]
impl DocumentSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_all(&self) -> Result<Vec<Document>> {
        let contents = fs::read_to_string(&self.path)
            .await
            .map_err(|e| RagError::Source(format!("{}: {}", self.name, e)))?;

        let records: Vec<KnowledgeRecord> = serde_json::from_str(&contents)
            .map_err(|e| RagError::Source(format!("{}: {}", self.name, e)))?;

        Ok(records.into_iter().map(Document::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_into_document() {
        let record = KnowledgeRecord {
            id: "faq_012".into(),
            text: "Happy hour discounts available 5-7pm.".into(),
            category: Some("promo".into()),
            restaurant_id: Some("rest_104".into()),
            source: Some("Restaurant Menu".into()),
            date_created: Some("2025-09-12".into()),
        };
        let doc = Document::from(record);
        assert_eq!(doc.id, "faq_012");
        assert_eq!(doc.category(), Some("promo"));
        assert_eq!(doc.restaurant_id(), Some("rest_104"));
        assert_eq!(doc.metadata["source"], "Restaurant Menu");
    }

    #[tokio::test]
    async fn test_json_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "faq_001", "text": "How can I track my order?", "category": "tracking",
                 "restaurant_id": null, "source": "FAQ", "date_created": "2025-09-12"},
                {"id": "faq_004", "text": "Vegan Burger: lettuce, tomato, vegan mayo.", "category": "menu",
                 "restaurant_id": "rest_101", "source": "Restaurant Menu", "date_created": "2025-09-12"}
            ]"#,
        )
        .unwrap();

        let docs = JsonFileSource::new(&path).list_all().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "faq_001");
        assert_eq!(docs[0].metadata["restaurant_id"], Value::Null);
        assert_eq!(docs[1].restaurant_id(), Some("rest_101"));
    }

    #[tokio::test]
    async fn test_json_records_need_only_id_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.json");
        std::fs::write(&path, r#"[{"id": "kb_1", "text": "Refunds take five days."}]"#).unwrap();

        let docs = JsonFileSource::new(&path).list_all().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "Refunds take five days.");
        assert_eq!(docs[0].category(), None);
        assert_eq!(docs[0].metadata["source"], Value::Null);
    }

    #[tokio::test]
    async fn test_json_file_source_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = JsonFileSource::new(dir.path().join("missing.json"));
        assert!(matches!(missing.list_all().await, Err(RagError::Source(_))));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"not": "an array"}"#).unwrap();
        assert!(matches!(JsonFileSource::new(&path).list_all().await, Err(RagError::Source(_))));
    }
}
