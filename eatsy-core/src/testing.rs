//! In-process provider for tests.

use crate::provider::{GenerateRequest, GenerateResponse, Provider, ProviderError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A deterministic [`Provider`] that records what it was asked.
///
/// Embeddings are hashed bags of words, so texts sharing words are similar
/// and identical texts score exactly 1.0. Generation echoes a fixed answer.
pub(crate) struct FakeProvider {
    answer: String,
    response: Option<GenerateResponse>,
    generation_error: Option<String>,
    generation_delay: Option<Duration>,
    empty_embeddings: bool,
    failing_embeddings: bool,
    embedding_failures_after: Option<usize>,
    short_embedding_after: Option<usize>,
    embed_calls: AtomicUsize,
    embed_requests: AtomicUsize,
    batch_calls: AtomicUsize,
    embedded_models: Mutex<Vec<String>>,
    generate_requests: Mutex<Vec<GenerateRequest>>,
}

impl FakeProvider {
    pub const DIMENSION: usize = 64;

    pub fn new() -> Self {
        Self {
            answer: "fake answer".to_string(),
            response: None,
            generation_error: None,
            generation_delay: None,
            empty_embeddings: false,
            failing_embeddings: false,
            embedding_failures_after: None,
            short_embedding_after: None,
            embed_calls: AtomicUsize::new(0),
            embed_requests: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            embedded_models: Mutex::new(Vec::new()),
            generate_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = answer.into();
        self
    }

    /// Returns `response` verbatim from every generation call.
    pub fn with_response(mut self, response: GenerateResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_failing_generation(mut self, message: impl Into<String>) -> Self {
        self.generation_error = Some(message.into());
        self
    }

    pub fn with_generation_delay(mut self, delay: Duration) -> Self {
        self.generation_delay = Some(delay);
        self
    }

    pub fn with_empty_embeddings(mut self) -> Self {
        self.empty_embeddings = true;
        self
    }

    pub fn with_failing_embeddings(mut self) -> Self {
        self.failing_embeddings = true;
        self
    }

    /// The first `requests` embedding requests (single or batch) succeed, later ones fail.
    pub fn with_embedding_failures_after(mut self, requests: usize) -> Self {
        self.embedding_failures_after = Some(requests);
        self
    }

    /// The first `count` vectors have full dimension, later ones are one short.
    pub fn with_short_embedding_after(mut self, count: usize) -> Self {
        self.short_embedding_after = Some(count);
        self
    }

    /// Number of texts embedded so far, individually or in batches.
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn embedded_models(&self) -> Vec<String> {
        self.embedded_models.lock().unwrap().clone()
    }

    pub fn generate_requests(&self) -> Vec<GenerateRequest> {
        self.generate_requests.lock().unwrap().clone()
    }

    fn begin_embedding(&self, model: &str) -> Result<()> {
        self.embedded_models.lock().unwrap().push(model.to_string());
        let request = self.embed_requests.fetch_add(1, Ordering::SeqCst);

        if self.failing_embeddings {
            return Err(ProviderError::Api {
                status: 503,
                message: "embedding backend unavailable".into(),
            });
        }
        if matches!(self.embedding_failures_after, Some(limit) if request >= limit) {
            return Err(ProviderError::Other("embedding quota exhausted".into()));
        }
        Ok(())
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let index = self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.empty_embeddings {
            return Vec::new();
        }

        let mut vector = bag_of_words(text);
        if matches!(self.short_embedding_after, Some(count) if index >= count) {
            vector.pop();
        }
        vector
    }
}

/// FNV-1a bucketed term counts.
fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; FakeProvider::DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in word.to_lowercase().bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        vector[(hash % FakeProvider::DIMENSION as u64) as usize] += 1.0;
    }
    vector
}

#[async_trait]
impl Provider for FakeProvider {
    async fn generate_content(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        self.generate_requests.lock().unwrap().push(request);

        if let Some(delay) = self.generation_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.generation_error {
            return Err(ProviderError::Other(message.clone()));
        }
        Ok(self
            .response
            .clone()
            .unwrap_or_else(|| GenerateResponse::from_text(self.answer.clone())))
    }

    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        self.begin_embedding(model)?;
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[&str], model: &str) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.begin_embedding(model)?;
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_embed_identically() {
        assert_eq!(bag_of_words("Vegan sushi"), bag_of_words("vegan SUSHI"));
        assert_eq!(bag_of_words("a b c").iter().sum::<f32>(), 3.0);
    }
}
