//! Query answering: retrieval, context assembly and generation.
//!
//! # Flow
//!
//! ```text
//! query ─▶ Router ─▶ ranked results ─▶ ContextAssembler ─▶ GenerationInvoker ─▶ answer
//!            │
//!            ├─ LexicalIndex
//!            └─ SemanticIndex
//! ```
//!
//! Both indexes are built once in [`Pipeline::new`] and are read-only
//! afterwards, so a `Pipeline` can be cloned into as many concurrent tasks as
//! needed without locking.

use crate::config::Config;
use crate::generation::{GenerationInvoker, GenerationOutcome};
use crate::provider::Provider;
use crate::rag::{
    ContextAssembler, DocumentSource, DocumentStore, Embedder, LexicalIndex, RagError, Result,
    RetrievalResult, Router, SemanticIndex, Strategy,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The answer to one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub query: String,
    pub answer: GenerationOutcome,
    /// Ids of the documents placed in the context, best first.
    pub sources: Vec<String>,
}

/// Answers support queries against a fixed knowledge base.
///
/// # Examples
///
/// ```no_run
/// use eatsy_core::{Config, GeminiProvider, Pipeline};
/// use eatsy_core::rag::SampleSource;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::resolve("config.yaml")?;
/// let provider = Arc::new(GeminiProvider::new(&config)?);
/// let pipeline = Pipeline::new(config, &SampleSource, provider).await?;
///
/// let result = pipeline.answer_query("How can I get a discount?", "lexical").await?;
/// println!("{}", result.answer.text());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<Config>,
    store: DocumentStore,
    router: Router,
    assembler: ContextAssembler,
    invoker: GenerationInvoker,
}

impl Pipeline {
    /// Builds a pipeline serving every strategy.
    pub async fn new(config: Config, source: &dyn DocumentSource, provider: Arc<dyn Provider>) -> Result<Self> {
        Self::with_strategies(config, source, provider, &Strategy::ALL).await
    }

    /// Builds a pipeline that serves lexical retrieval only and never embeds.
    pub async fn lexical_only(config: Config, source: &dyn DocumentSource, provider: Arc<dyn Provider>) -> Result<Self> {
        Self::with_strategies(config, source, provider, &[Strategy::Lexical]).await
    }

    /// Builds a pipeline serving only `strategies`.
    ///
    /// The lexical index is always built. The semantic index is built, and
    /// the documents embedded, only when [`Strategy::Semantic`] is requested.
    ///
    /// # Errors
    ///
    /// Any failure here is a startup failure: invalid configuration, a source
    /// that cannot be read or has no documents, or an embedding build error.
    pub async fn with_strategies(
        config: Config,
        source: &dyn DocumentSource,
        provider: Arc<dyn Provider>,
        strategies: &[Strategy],
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| RagError::Configuration(e.to_string()))?;

        let store = DocumentStore::from_source(source).await?;
        if store.is_empty() {
            return Err(RagError::Configuration(format!(
                "document source '{}' supplied no documents",
                source.name()
            )));
        }

        let lexical = Arc::new(LexicalIndex::with_params(store.clone(), config.rag.bm25));

        let semantic = if strategies.contains(&Strategy::Semantic) {
            let embedder = Embedder::new(provider.clone(), config.rag.embedding_model.clone());
            Some(Arc::new(SemanticIndex::build(store.clone(), embedder).await?))
        } else {
            None
        };

        let router = Router::new(lexical, semantic);
        let assembler = ContextAssembler::from_config(&config.context);
        let invoker = GenerationInvoker::new(provider, config.system_prompt.clone())
            .with_timeout(generation_deadline(&config))
            .with_temperature(config.llm.temperature);

        info!(
            documents = store.len(),
            strategies = ?router.strategies(),
            model = %config.llm.model,
            "Pipeline ready"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            router,
            assembler,
            invoker,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.store
    }

    pub fn strategies(&self) -> Vec<Strategy> {
        self.router.strategies()
    }

    /// Retrieves ranked documents without generating an answer.
    pub async fn retrieve(&self, query: &str, strategy: &str, top_k: usize) -> Result<RetrievalResult> {
        self.router.retrieve(query, strategy, top_k).await
    }

    /// Answers `query` using the index named by `strategy`.
    ///
    /// Only invalid arguments (an unknown or disabled strategy) are returned
    /// as `Err`, and they are detected before any backend is called. Backend
    /// failures, at retrieval or generation time, come back inside the
    /// [`QueryAnswer`] as [`GenerationOutcome::Failed`].
    pub async fn answer_query(&self, query: &str, strategy: &str) -> Result<QueryAnswer> {
        let strategy: Strategy = strategy.parse()?;

        let results = match self
            .router
            .retrieve_with(strategy, query, self.config.rag.top_k)
            .await
        {
            Ok(results) => results,
            Err(e) if e.is_invalid_argument() => return Err(e),
            Err(e) => {
                warn!(strategy = %strategy, error = %e, "Retrieval failed");
                return Ok(QueryAnswer {
                    query: query.to_string(),
                    answer: GenerationOutcome::Failed(e.to_string()),
                    sources: Vec::new(),
                });
            }
        };

        let context = self.assembler.assemble(&results);
        let sources = results
            .iter()
            .take(self.config.context.max_documents)
            .map(|r| r.document.id.clone())
            .collect();

        let answer = self
            .invoker
            .generate(query, &context, &self.config.llm.model)
            .await;

        Ok(QueryAnswer {
            query: query.to_string(),
            answer,
            sources,
        })
    }
}

/// Covers every attempt the provider may make, plus one second for backoff.
fn generation_deadline(config: &Config) -> Duration {
    let attempts = u64::from(config.llm.max_retries) + 1;
    Duration::from_secs(config.llm.request_timeout_secs.saturating_mul(attempts) + 1)
}
