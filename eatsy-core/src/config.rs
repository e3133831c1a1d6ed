use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Missing API credentials: set GEMINI_API_KEY (or GOOGLE_API_KEY)")]
    MissingCredentials,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the whole support assistant.
///
/// Values come from an optional YAML file and are then overridden by the
/// environment (see [`Config::apply_env`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

/// Configuration for the generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    /// Never written back out; usually supplied through the environment.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Per-request timeout. A timed out call is treated as a backend failure.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Extra attempts for transport errors, 429 and 5xx responses.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Sampling temperature; unset leaves the model default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Configuration for retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub embedding_model: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub bm25: Bm25Config,
}

/// BM25 tuning constants.
///
/// `k1` controls term-frequency saturation, `b` controls how strongly scores
/// are normalized by document length (0 disables it, 1 applies it fully).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Config {
    pub k1: f32,
    pub b: f32,
}

/// Bounds on the context string handed to the generation backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContextConfig {
    pub max_documents: usize,
    pub max_chars_per_document: usize,
}

fn default_system_prompt() -> String {
    "You are a helpful Eatsy customer support assistant.\n\
     Use the following knowledge base context to answer the query."
        .to_string()
}

fn default_top_k() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: None,
            request_timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            temperature: None,
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding_model: "gemini-embedding-001".to_string(),
            top_k: default_top_k(),
            bm25: Bm25Config::default(),
        }
    }
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_documents: 1,
            max_chars_per_document: 250,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            system_prompt: default_system_prompt(),
            rag: RagConfig::default(),
            context: ContextConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `config.yaml` if it exists, otherwise use defaults.
    pub fn load_or_default() -> Self {
        Self::load("config.yaml").unwrap_or_default()
    }

    /// Builds the effective startup configuration.
    ///
    /// A missing file falls back to defaults; a file that exists but does not
    /// parse is an error. Environment overrides are applied last and the
    /// result is validated.
    pub fn resolve<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Overrides fields from an arbitrary variable lookup.
    ///
    /// Recognized names: `MODEL_NAME`, `EMBED_MODEL_NAME`, `TOP_K`,
    /// `GEMINI_API_KEY` (falling back to `GOOGLE_API_KEY`) and `GEMINI_BASE_URL`.
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(model) = get("MODEL_NAME") {
            self.llm.model = model;
        }
        if let Some(model) = get("EMBED_MODEL_NAME") {
            self.rag.embedding_model = model;
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(raw) = get("TOP_K") {
            self.rag.top_k = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name: "TOP_K", value: raw.clone() })?;
        }

        Ok(())
    }

    /// Checks the invariants that must hold before any index is built.
    ///
    /// Credentials are checked separately by [`Config::api_key`] because a
    /// lexical-only pipeline never talks to the backend.
    pub fn validate(&self) -> Result<()> {
        if self.rag.top_k == 0 {
            return Err(ConfigError::Invalid("rag.top_k must be at least 1".into()));
        }
        if self.llm.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("llm.request_timeout_secs must be at least 1".into()));
        }
        if let Some(temperature) = self.llm.temperature {
            if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::Invalid(format!(
                    "llm.temperature must be within [0, 2], got {}",
                    temperature
                )));
            }
        }
        if self.context.max_documents == 0 {
            return Err(ConfigError::Invalid("context.max_documents must be at least 1".into()));
        }
        let Bm25Config { k1, b } = self.rag.bm25;
        if !k1.is_finite() || k1 < 0.0 {
            return Err(ConfigError::Invalid(format!("rag.bm25.k1 must be >= 0, got {}", k1)));
        }
        if !b.is_finite() || !(0.0..=1.0).contains(&b) {
            return Err(ConfigError::Invalid(format!("rag.bm25.b must be within [0, 1], got {}", b)));
        }
        if self.llm.model.trim().is_empty() || self.rag.embedding_model.trim().is_empty() {
            return Err(ConfigError::Invalid("model names must not be empty".into()));
        }
        Ok(())
    }

    /// Returns the configured API key, or a startup error if none is set.
    pub fn api_key(&self) -> Result<&str> {
        self.llm
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingCredentials)
    }
}
