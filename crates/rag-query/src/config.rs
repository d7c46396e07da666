//! Configuration for the RAG query service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Environment variable naming an optional TOML config file
pub const CONFIG_FILE_ENV: &str = "RAG_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Ollama (embedding, chat, expansion) configuration
    pub ollama: OllamaConfig,
    /// Qdrant vector store configuration
    pub qdrant: QdrantConfig,
    /// Cross-encoder rerank service configuration
    pub reranker: RerankerConfig,
    /// Retrieval sizes and limits
    pub retrieval: RetrievalConfig,
    /// Outbound HTTP policy
    pub http: HttpConfig,
    /// Prompt templates
    pub prompts: PromptConfig,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            ollama: OllamaConfig::default(),
            qdrant: QdrantConfig::default(),
            reranker: RerankerConfig::default(),
            retrieval: RetrievalConfig::default(),
            http: HttpConfig::default(),
            prompts: PromptConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
        }
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Chat (answer) model name
    pub chat_model: String,
    /// Query expansion model name
    pub expand_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://ollama:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            chat_model: "llama3.1:8b".to_string(),
            expand_model: "llama3.1:8b".to_string(),
        }
    }
}

/// Qdrant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    /// Qdrant base URL
    pub base_url: String,
    /// Collection searched when a request names none
    pub collection: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            base_url: "http://qdrant:6333".to_string(),
            collection: "rag_docs".to_string(),
        }
    }
}

/// Cross-encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    /// Full URL of the rerank endpoint
    pub url: String,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            url: "http://crossencoder:80/rerank".to_string(),
        }
    }
}

/// Retrieval sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates requested from the vector store
    pub default_top_k: usize,
    /// Documents kept after reranking
    pub default_top_n: usize,
    /// Characters of each document shown to the chat model
    pub context_snippet_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 25,
            default_top_n: 5,
            context_snippet_chars: 1200,
        }
    }
}

/// Outbound HTTP policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Retries after the first attempt
    pub retries: u32,
    /// Backoff seed in seconds (delays: f, 2f, 4f, ...)
    pub backoff_factor: f64,
    /// Cap on a single computed backoff
    pub max_backoff_secs: u64,
    /// Connect-phase timeout
    pub connect_timeout_secs: u64,
    /// Read-phase timeout (generation can be slow)
    pub read_timeout_secs: u64,
    /// Statuses retried as transient
    pub retry_statuses: Vec<u16>,
    /// Timeout of a health probe
    pub health_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_factor: 0.5,
            max_backoff_secs: 120,
            connect_timeout_secs: 5,
            read_timeout_secs: 300,
            retry_statuses: vec![429, 500, 502, 503, 504],
            health_timeout_secs: 5,
        }
    }
}

/// Prompt template location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Directory holding `query_expansion.md`, `rag_system.md`, `rag_user.md`.
    /// Built-in templates are used when unset.
    pub dir: Option<PathBuf>,
}

impl RagConfig {
    /// Load config: defaults, then the `RAG_CONFIG` file, then env overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file; absent keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| Error::config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Apply the service's environment overrides using `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OLLAMA_URL") {
            self.ollama.base_url = v;
        }
        if let Some(v) = get("OLLAMA_EMBED_MODEL") {
            self.ollama.embed_model = v;
        }
        if let Some(v) = get("OLLAMA_CHAT_MODEL") {
            self.ollama.chat_model = v;
        }
        if let Some(v) = get("OLLAMA_EXPAND_MODEL") {
            self.ollama.expand_model = v;
        }
        if let Some(v) = get("QDRANT_URL") {
            self.qdrant.base_url = v;
        }
        if let Some(v) = get("QDRANT_COLLECTION") {
            self.qdrant.collection = v;
        }
        if let Some(v) = get("CROSSENCODER_URL") {
            self.reranker.url = v;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v.to_lowercase();
        }
        if let Some(v) = get("PROMPTS_DIR") {
            self.prompts.dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("RAG_HOST") {
            self.server.host = v;
        }

        override_parsed(&get, "RAG_PORT", &mut self.server.port)?;
        override_parsed(&get, "DEFAULT_TOPK", &mut self.retrieval.default_top_k)?;
        override_parsed(&get, "DEFAULT_TOPN", &mut self.retrieval.default_top_n)?;
        override_parsed(
            &get,
            "CONTEXT_SNIPPET_CHARS",
            &mut self.retrieval.context_snippet_chars,
        )?;
        override_parsed(&get, "HTTP_RETRIES", &mut self.http.retries)?;
        override_parsed(&get, "HTTP_BACKOFF_FACTOR", &mut self.http.backoff_factor)?;
        override_parsed(&get, "CONNECT_TIMEOUT", &mut self.http.connect_timeout_secs)?;
        override_parsed(&get, "READ_TIMEOUT", &mut self.http.read_timeout_secs)?;

        Ok(())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.default_top_k == 0 {
            return Err(Error::config("default_top_k must be at least 1"));
        }
        if self.retrieval.default_top_n == 0 {
            return Err(Error::config("default_top_n must be at least 1"));
        }
        if self.retrieval.context_snippet_chars == 0 {
            return Err(Error::config("context_snippet_chars must be at least 1"));
        }
        if !self.http.backoff_factor.is_finite() || self.http.backoff_factor < 0.0 {
            return Err(Error::config("backoff_factor must be a non-negative number"));
        }
        for (name, url) in [
            ("ollama.base_url", &self.ollama.base_url),
            ("qdrant.base_url", &self.qdrant.base_url),
            ("reranker.url", &self.reranker.url),
        ] {
            if url.trim().is_empty() {
                return Err(Error::config(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }

    /// Distinct Ollama models the service needs at runtime
    pub fn required_models(&self) -> Vec<String> {
        let mut models: Vec<String> = Vec::with_capacity(3);
        for model in [
            &self.ollama.embed_model,
            &self.ollama.chat_model,
            &self.ollama.expand_model,
        ] {
            if !models.contains(model) {
                models.push(model.clone());
            }
        }
        models
    }
}

fn override_parsed<T, G>(get: &G, key: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| Error::config(format!("{} has invalid value '{}': {}", key, raw, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_service_constants() {
        let config = RagConfig::default();
        assert_eq!(config.retrieval.default_top_k, 25);
        assert_eq!(config.retrieval.default_top_n, 5);
        assert_eq!(config.retrieval.context_snippet_chars, 1200);
        assert_eq!(config.qdrant.collection, "rag_docs");
        assert_eq!(config.http.retries, 3);
        assert_eq!(config.http.retry_statuses, vec![429, 500, 502, 503, 504]);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = RagConfig::default();
        config
            .apply_env(env(&[
                ("OLLAMA_URL", "http://localhost:11434"),
                ("QDRANT_COLLECTION", "manuals"),
                ("DEFAULT_TOPK", "40"),
                ("HTTP_BACKOFF_FACTOR", "0.25"),
                ("READ_TIMEOUT", "60"),
                ("LOG_LEVEL", "DEBUG"),
            ]))
            .unwrap();

        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.qdrant.collection, "manuals");
        assert_eq!(config.retrieval.default_top_k, 40);
        assert_eq!(config.http.backoff_factor, 0.25);
        assert_eq!(config.http.read_timeout_secs, 60);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn bad_numeric_override_is_an_error() {
        let mut config = RagConfig::default();
        let err = config.apply_env(env(&[("DEFAULT_TOPN", "five")])).unwrap_err();
        assert!(err.to_string().contains("DEFAULT_TOPN"));
    }

    #[test]
    fn validate_rejects_zero_top_n() {
        let mut config = RagConfig::default();
        config.retrieval.default_top_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: RagConfig = toml::from_str(
            r#"
            [qdrant]
            collection = "faq"

            [http]
            retries = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.qdrant.collection, "faq");
        assert_eq!(config.qdrant.base_url, "http://qdrant:6333");
        assert_eq!(config.http.retries, 1);
        assert_eq!(config.http.read_timeout_secs, 300);
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rag.toml");
        std::fs::write(&path, "log_level = \"warn\"\n[retrieval]\ndefault_top_n = 3\n").unwrap();

        let config = RagConfig::from_file(&path).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.retrieval.default_top_n, 3);
        assert_eq!(config.retrieval.default_top_k, 25);
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let err = RagConfig::from_file("/nonexistent/rag.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn required_models_are_deduplicated() {
        let config = RagConfig::default();
        assert_eq!(config.required_models(), vec!["nomic-embed-text", "llama3.1:8b"]);
    }
}
