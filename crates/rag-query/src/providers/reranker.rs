//! Reranker trait for cross-encoder relevance scoring

use async_trait::async_trait;

use crate::error::Result;
use crate::types::RerankPair;

/// Trait for scoring (query, candidate) pairs jointly
///
/// Implementations:
/// - `CrossEncoderReranker`: HTTP cross-encoder sidecar
#[async_trait]
pub trait Reranker: Send + Sync {
    /// One score per pair, positionally aligned with `pairs`.
    /// Higher is more relevant.
    async fn rerank(&self, pairs: &[RerankPair]) -> Result<Vec<f64>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
