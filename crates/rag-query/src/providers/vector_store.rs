//! Vector store provider trait for nearest-neighbour search

use async_trait::async_trait;

use crate::error::Result;
use crate::types::VectorRecord;

/// Trait for similarity search over a named collection
///
/// Implementations:
/// - `QdrantVectorStore`: Qdrant REST `points/search`
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Up to `limit` records nearest to `vector`, in the store's order,
    /// each with its payload.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorRecord>>;

    /// Check if the backing service is reachable
    async fn health_check(&self) -> bool;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
