//! RAG query pipeline
//!
//! Stages run strictly in order:
//!
//! 1. resolve request defaults
//! 2. expand the query (optional, falls back to the original query)
//! 3. embed the final query text (fatal)
//! 4. vector search (fatal)
//! 5. cross-encoder rerank (falls back to stored scores)
//! 6. sort, truncate to `topN`, build numbered context
//! 7. chat generation (fatal)
//!
//! A fatal stage aborts the request with [`Error::Upstream`] naming it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{RagConfig, RetrievalConfig};
use crate::error::{Error, Result, Stage};
use crate::generation::{build_blocks, render_context, OllamaClient, PromptTemplates};
use crate::providers::{
    CrossEncoderReranker, EmbeddingProvider, LlmProvider, OllamaProvider, QdrantVectorStore,
    QueryExpander, Reranker, VectorStoreProvider,
};
use crate::transport::{ResilientClient, RetryPolicy};
use crate::types::{HealthCheck, RagQuery, RagQueryRequest, RagResponse, VectorRecord};

use super::outcome::StageOutcome;
use super::rank::{build_pairs, fallback_scores, merge_scores, rank_top_n};

/// The services each stage calls
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub vector_store: Arc<dyn VectorStoreProvider>,
    pub reranker: Arc<dyn Reranker>,
    pub llm: Arc<dyn LlmProvider>,
    pub expander: Arc<dyn QueryExpander>,
}

/// Request-scoped orchestration over shared, immutable providers.
/// Cloning is cheap and clones share everything.
#[derive(Clone)]
pub struct RagPipeline {
    providers: Providers,
    templates: Arc<PromptTemplates>,
    retrieval: RetrievalConfig,
    default_collection: String,
}

impl RagPipeline {
    pub fn new(
        providers: Providers,
        templates: Arc<PromptTemplates>,
        retrieval: RetrievalConfig,
        default_collection: impl Into<String>,
    ) -> Self {
        Self {
            providers,
            templates,
            retrieval,
            default_collection: default_collection.into(),
        }
    }

    /// Build the HTTP-backed pipeline described by `config`
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let http = ResilientClient::new(RetryPolicy::from_config(&config.http))?;
        let ollama = Arc::new(OllamaClient::new(
            http.clone(),
            &config.ollama,
            Duration::from_secs(config.http.health_timeout_secs),
        ));
        Self::with_clients(config, http, ollama)
    }

    /// Build the pipeline over an existing transport and Ollama client
    pub fn with_clients(
        config: &RagConfig,
        http: ResilientClient,
        ollama: Arc<OllamaClient>,
    ) -> Result<Self> {
        let templates = Arc::new(PromptTemplates::load(config.prompts.dir.as_deref())?);
        let health_timeout = Duration::from_secs(config.http.health_timeout_secs);

        let (embedder, llm, expander) =
            OllamaProvider::new(ollama, &config.ollama, Arc::clone(&templates)).split();
        let vector_store = QdrantVectorStore::new(http.clone(), &config.qdrant, health_timeout)?;
        let reranker = CrossEncoderReranker::new(http, &config.reranker);

        let providers = Providers {
            embedder: Arc::new(embedder),
            vector_store: Arc::new(vector_store),
            reranker: Arc::new(reranker),
            llm: Arc::new(llm),
            expander: Arc::new(expander),
        };

        Ok(Self::new(
            providers,
            templates,
            config.retrieval.clone(),
            config.qdrant.collection.clone(),
        ))
    }

    /// Chat model reported in responses
    pub fn chat_model(&self) -> &str {
        self.providers.llm.model()
    }

    pub fn embed_model(&self) -> &str {
        self.providers.embedder.model()
    }

    pub fn default_collection(&self) -> &str {
        &self.default_collection
    }

    pub fn retrieval(&self) -> &RetrievalConfig {
        &self.retrieval
    }

    /// Answer one request
    pub async fn run(&self, request: &RagQueryRequest) -> Result<RagResponse> {
        let start = Instant::now();
        let query = request.resolve(&self.retrieval, &self.default_collection);

        tracing::info!(
            collection = %query.collection,
            top_k = query.top_k,
            top_n = query.top_n,
            expansion = query.use_expansion,
            "RAG query: \"{}\"",
            query.query
        );

        let expansion = self.expand(&query).await;
        let query_text = compose_query(&query.query, expansion.value().as_deref());

        let vector = self
            .providers
            .embedder
            .embed(&query_text)
            .await
            .map_err(|e| fatal(Stage::Embedding, e))?;

        let records = self
            .providers
            .vector_store
            .search(&query.collection, &vector, query.top_k)
            .await
            .map_err(|e| fatal(Stage::VectorSearch, e))?;
        tracing::debug!(candidates = records.len(), "Vector search returned candidates");

        let scores = self.rerank(&query_text, &records).await;
        let top_docs = rank_top_n(merge_scores(records, scores.value()), query.top_n);

        let context = render_context(&build_blocks(
            &top_docs,
            self.retrieval.context_snippet_chars,
        ));
        let user_prompt = self.templates.user_prompt(&query.query, &context)?;

        let answer = self
            .providers
            .llm
            .chat(self.templates.system_prompt(), &user_prompt)
            .await
            .map_err(|e| fatal(Stage::Generation, e))?;

        tracing::info!(
            docs = top_docs.len(),
            expansion_fallback = expansion.is_fallback(),
            rerank_fallback = scores.is_fallback(),
            expansion_fallback_reason = ?expansion.reason(),
            rerank_fallback_reason = ?scores.reason(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "RAG query answered"
        );

        Ok(RagResponse {
            answer,
            model_used: self.chat_model().to_string(),
            top_docs,
            context,
        })
    }

    /// Reachability of the embedding and search backends, probed concurrently
    pub async fn health(&self) -> HealthCheck {
        let (ollama_up, qdrant_up) = tokio::join!(
            self.providers.embedder.health_check(),
            self.providers.vector_store.health_check()
        );
        HealthCheck::from_probes(ollama_up, qdrant_up)
    }

    /// Expanded text, if requested and non-empty. Failure keeps the original query.
    async fn expand(&self, query: &RagQuery) -> StageOutcome<Option<String>> {
        if !query.use_expansion {
            return StageOutcome::Completed(None);
        }

        let result = self
            .providers
            .expander
            .expand(&query.query)
            .await
            .map(|text| Some(text.trim().to_string()).filter(|t| !t.is_empty()));

        StageOutcome::recover(Stage::Expansion, result, || None)
    }

    /// One score per record. Failure substitutes the stored scores.
    async fn rerank(&self, query_text: &str, records: &[VectorRecord]) -> StageOutcome<Vec<f64>> {
        if records.is_empty() {
            return StageOutcome::Completed(Vec::new());
        }

        let pairs = build_pairs(query_text, records);
        let result = self.providers.reranker.rerank(&pairs).await;

        match StageOutcome::recover(Stage::Rerank, result, || fallback_scores(records)) {
            StageOutcome::Completed(scores) if scores.len() != records.len() => {
                let reason = format!(
                    "{} returned {} scores for {} candidates",
                    self.providers.reranker.name(),
                    scores.len(),
                    records.len()
                );
                tracing::warn!(stage = %Stage::Rerank, "{}, padding with stored scores", reason);
                StageOutcome::Fallback {
                    value: scores,
                    reason,
                }
            }
            outcome => outcome,
        }
    }
}

/// Text that is embedded and reranked against
pub fn compose_query(query: &str, expansion: Option<&str>) -> String {
    match expansion {
        Some(expanded) if !expanded.is_empty() => {
            format!("Original: {}\nExpanded: {}", query, expanded)
        }
        _ => query.to_string(),
    }
}

fn fatal(stage: Stage, source: Error) -> Error {
    tracing::error!(%stage, error = %source, "{}", stage.failure_detail());
    Error::upstream(stage, source)
}
