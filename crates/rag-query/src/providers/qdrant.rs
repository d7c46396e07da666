//! Qdrant vector store provider

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::QdrantConfig;
use crate::error::{Error, Result};
use crate::transport::ResilientClient;
use crate::types::VectorRecord;

use super::vector_store::VectorStoreProvider;

/// Search reply envelopes, in priority order
const SEARCH_SHAPES: &[(&str, fn(&Value) -> Option<&Vec<Value>>)] = &[
    ("result.data", paged_hits),
    ("result", listed_hits),
];

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

/// Qdrant REST client for `points/search`
pub struct QdrantVectorStore {
    http: ResilientClient,
    base_url: Url,
    health_timeout: Duration,
}

impl QdrantVectorStore {
    /// Create a new Qdrant store
    pub fn new(http: ResilientClient, config: &QdrantConfig, health_timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::config(format!("Invalid Qdrant URL '{}': {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Qdrant URL '{}' cannot be used as a base",
                config.base_url
            )));
        }
        Ok(Self {
            http,
            base_url,
            health_timeout,
        })
    }

    /// `{base}/collections/{collection}/points/search`, with the collection
    /// name percent-encoded as one path segment
    pub fn search_url(&self, collection: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config("Qdrant URL cannot be used as a base"))?
            .pop_if_empty()
            .extend(["collections", collection, "points", "search"]);
        Ok(url)
    }

    fn collections_url(&self) -> String {
        format!("{}/collections", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl VectorStoreProvider for QdrantVectorStore {
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorRecord>> {
        let url = self.search_url(collection)?;
        let request = SearchRequest {
            vector,
            limit,
            with_payload: true,
        };

        let reply = self.http.post_json(url.as_str(), &request).await?;
        let records = decode_search(&reply);

        tracing::debug!(collection, limit, hits = records.len(), "Qdrant search completed");
        Ok(records)
    }

    async fn health_check(&self) -> bool {
        self.http.probe(&self.collections_url(), self.health_timeout).await
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

/// Normalize a search reply into records, preserving the store's order.
/// An envelope with no known hit list yields no records.
pub fn decode_search(reply: &Value) -> Vec<VectorRecord> {
    for (name, matcher) in SEARCH_SHAPES {
        if let Some(hits) = matcher(reply) {
            tracing::trace!(shape = name, hits = hits.len(), "decoded search reply");
            return hits
                .iter()
                .enumerate()
                .map(|(i, hit)| VectorRecord::from_point(i, hit))
                .collect();
        }
    }
    tracing::warn!("Qdrant reply has no result list, treating as no matches");
    Vec::new()
}

fn paged_hits(reply: &Value) -> Option<&Vec<Value>> {
    reply.get("result")?.get("data")?.as_array()
}

fn listed_hits(reply: &Value) -> Option<&Vec<Value>> {
    reply.get("result")?.as_array()
}
