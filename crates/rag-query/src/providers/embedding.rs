//! Embedding provider trait for turning query text into a vector

use async_trait::async_trait;

use crate::error::Result;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OllamaEmbedder`: Ollama `/api/embed`
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate one flat embedding for `text`
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Check if the backing service is reachable
    async fn health_check(&self) -> bool;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the embedding model being used
    fn model(&self) -> &str;
}
