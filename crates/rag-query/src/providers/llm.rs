//! LLM provider traits for answer generation and query expansion

use async_trait::async_trait;

use crate::error::Result;

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OllamaLlm`: Ollama `/api/chat`
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Answer `user` under the instructions in `system`
    async fn chat(&self, system: &str, user: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

/// Trait for rewriting a query into a richer one before retrieval
///
/// Implementations:
/// - `OllamaExpander`: Ollama `/api/generate` with the expansion template
#[async_trait]
pub trait QueryExpander: Send + Sync {
    /// Elaborated form of `query`; may be empty
    async fn expand(&self, query: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
