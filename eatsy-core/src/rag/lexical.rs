//! Lexical retrieval with BM25 scoring.
//!
//! Documents and queries go through the same analyzer: split on anything that
//! is not alphanumeric, lowercase, drop English stop words, then strip plural
//! suffixes so that "discount" matches "discounts".
//!
//! For a query with terms `q` and a document `d` the score is
//!
//! ```text
//! sum over q of  idf(q) * tf(q, d) * (k1 + 1) / (tf(q, d) + k1 * (1 - b + b * |d| / avgdl))
//! idf(q) = ln(1 + (N - n(q) + 0.5) / (n(q) + 0.5))
//! ```
//!
//! with the defaults `k1 = 1.2` and `b = 0.75`. This `idf` is always positive,
//! so every document sharing at least one term with the query scores above
//! zero and every other document is left out of the result.

use super::router::Retrieve;
use super::store::DocumentStore;
use super::types::{rank, RetrievalResult, SearchResult};
use super::{check_top_k, Result, Strategy};
use crate::config::Bm25Config;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
    "it", "its", "of", "on", "that", "the", "to", "was", "will", "with", "or", "but", "not",
    "this", "these", "they", "them", "their", "there", "then", "than", "so", "if", "when",
    "where", "why", "how", "what", "which", "who", "whom", "whose", "can", "could", "should",
    "would", "may", "might", "must", "shall", "do", "does", "did", "have", "had", "having",
    "i", "me", "my", "we", "our", "us", "you", "your",
];

/// Splits `text` into normalized index terms.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .map(|word| stem_plural(&word))
        .collect()
}

/// Harman's "S" stemmer: folds regular English plurals onto their singular.
fn stem_plural(word: &str) -> String {
    if word.len() > 3 && word.ends_with("ies") && !word.ends_with("eies") && !word.ends_with("aies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.len() > 2 && word.ends_with("es") && !(word.ends_with("aes") || word.ends_with("ees") || word.ends_with("oes")) {
        return word[..word.len() - 1].to_string();
    }
    if word.len() > 1 && word.ends_with('s') && !(word.ends_with("us") || word.ends_with("ss")) {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// A read-only BM25 index over a [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    store: DocumentStore,
    /// term -> (document position, term frequency), positions ascending
    postings: HashMap<String, Vec<(usize, u32)>>,
    doc_lengths: Vec<u32>,
    avg_doc_len: f32,
    params: Bm25Config,
}

impl LexicalIndex {
    /// Builds the index with the default BM25 constants.
    pub fn build(store: DocumentStore) -> Self {
        Self::with_params(store, Bm25Config::default())
    }

    pub fn with_params(store: DocumentStore, params: Bm25Config) -> Self {
        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(store.len());

        for (position, doc) in store.documents().iter().enumerate() {
            let terms = tokenize(&doc.text);
            doc_lengths.push(terms.len() as u32);

            let mut frequencies: HashMap<String, u32> = HashMap::new();
            for term in terms {
                *frequencies.entry(term).or_insert(0) += 1;
            }
            for (term, tf) in frequencies {
                postings.entry(term).or_default().push((position, tf));
            }
        }

        let total_len: u64 = doc_lengths.iter().map(|&len| u64::from(len)).sum();
        let avg_doc_len = if doc_lengths.is_empty() {
            1.0
        } else {
            (total_len as f32 / doc_lengths.len() as f32).max(1.0)
        };

        info!(documents = store.len(), terms = postings.len(), avg_doc_len, "Built lexical index");

        Self {
            store,
            postings,
            doc_lengths,
            avg_doc_len,
            params,
        }
    }

    /// Number of documents containing `term` (after normalization).
    pub fn document_frequency(&self, term: &str) -> usize {
        tokenize(term)
            .first()
            .and_then(|t| self.postings.get(t))
            .map_or(0, Vec::len)
    }

    fn idf(&self, document_frequency: usize) -> f32 {
        let n = self.store.len() as f32;
        let df = document_frequency as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Scores every document sharing a term with `text` and returns the best
    /// `top_k`, ties broken by insertion order.
    pub fn search(&self, text: &str, top_k: usize) -> Result<RetrievalResult> {
        check_top_k(top_k)?;

        let mut seen = HashSet::new();
        let terms: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|term| seen.insert(term.clone()))
            .collect();

        let Bm25Config { k1, b } = self.params;
        let mut scores: Vec<Option<f32>> = vec![None; self.store.len()];

        for term in &terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let idf = self.idf(postings.len());

            for &(position, tf) in postings {
                let tf = tf as f32;
                let length_ratio = self.doc_lengths[position] as f32 / self.avg_doc_len;
                let weight = idf * tf * (k1 + 1.0) / (tf + k1 * (1.0 - b + b * length_ratio));
                *scores[position].get_or_insert(0.0) += weight;
            }
        }

        let candidates: Vec<SearchResult> = scores
            .into_iter()
            .enumerate()
            .filter_map(|(position, score)| {
                let score = score?;
                let document = self.store.get(position)?.clone();
                Some(SearchResult { document, score })
            })
            .collect();

        debug!(query = %text, terms = ?terms, matched = candidates.len(), "Lexical search");
        Ok(rank(candidates, top_k))
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl Retrieve for LexicalIndex {
    fn strategy(&self) -> Strategy {
        Strategy::Lexical
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<RetrievalResult> {
        self.search(text, top_k)
    }
}
