//! Ollama-based providers for embeddings, chat and query expansion
//!
//! Wraps the shared OllamaClient to implement the provider traits.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::OllamaConfig;
use crate::error::Result;
use crate::generation::{OllamaClient, PromptTemplates};

use super::embedding::EmbeddingProvider;
use super::llm::{LlmProvider, QueryExpander};

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaEmbedder {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text, &self.model).await
    }

    async fn health_check(&self) -> bool {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Ollama LLM provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        tracing::info!(model = %self.model, "Generating answer");
        self.client.chat(system, user, &self.model).await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Ollama query expander: renders the expansion template and completes it
pub struct OllamaExpander {
    client: Arc<OllamaClient>,
    model: String,
    templates: Arc<PromptTemplates>,
}

impl OllamaExpander {
    /// Create from existing OllamaClient
    pub fn from_client(
        client: Arc<OllamaClient>,
        model: String,
        templates: Arc<PromptTemplates>,
    ) -> Self {
        Self {
            client,
            model,
            templates,
        }
    }
}

#[async_trait]
impl QueryExpander for OllamaExpander {
    async fn expand(&self, query: &str) -> Result<String> {
        let prompt = self.templates.expansion_prompt(query)?;
        self.client.generate(&prompt, &self.model).await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Embedder, chat model and expander sharing a single client
pub struct OllamaProvider {
    embedder: OllamaEmbedder,
    llm: OllamaLlm,
    expander: OllamaExpander,
}

impl OllamaProvider {
    /// Create the three providers over `client`
    pub fn new(
        client: Arc<OllamaClient>,
        config: &OllamaConfig,
        templates: Arc<PromptTemplates>,
    ) -> Self {
        Self {
            embedder: OllamaEmbedder::from_client(Arc::clone(&client), config.embed_model.clone()),
            llm: OllamaLlm::from_client(Arc::clone(&client), config.chat_model.clone()),
            expander: OllamaExpander::from_client(client, config.expand_model.clone(), templates),
        }
    }

    /// Split into separate providers
    pub fn split(self) -> (OllamaEmbedder, OllamaLlm, OllamaExpander) {
        (self.embedder, self.llm, self.expander)
    }
}
