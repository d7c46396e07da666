//! Query request types

use serde::{Deserialize, Serialize};

use crate::config::RetrievalConfig;

/// Body of `POST /rag-query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagQueryRequest {
    /// The question to answer
    pub query: String,

    /// Expand the query with the LLM before retrieval (default: false)
    #[serde(default)]
    pub use_expansion: Option<bool>,

    /// Candidates fetched from the vector store (default: configured)
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Documents kept after reranking (default: configured)
    #[serde(default)]
    pub top_n: Option<usize>,

    /// Collection to search (default: configured)
    #[serde(default)]
    pub collection: Option<String>,
}

impl RagQueryRequest {
    /// Create a request with every option defaulted
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Opt in to query expansion
    pub fn with_expansion(mut self) -> Self {
        self.use_expansion = Some(true);
        self
    }

    /// Set the number of candidates to retrieve
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Set the number of documents to keep
    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    /// Search a specific collection
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Fill in defaults. A `topK`/`topN` of zero counts as absent.
    pub fn resolve(&self, retrieval: &RetrievalConfig, default_collection: &str) -> RagQuery {
        RagQuery {
            query: self.query.clone(),
            use_expansion: self.use_expansion.unwrap_or(false),
            top_k: self
                .top_k
                .filter(|k| *k > 0)
                .unwrap_or(retrieval.default_top_k),
            top_n: self
                .top_n
                .filter(|n| *n > 0)
                .unwrap_or(retrieval.default_top_n),
            collection: self
                .collection
                .clone()
                .unwrap_or_else(|| default_collection.to_string()),
        }
    }
}

/// A request with every parameter resolved; immutable for the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagQuery {
    pub query: String,
    pub use_expansion: bool,
    pub top_k: usize,
    pub top_n: usize,
    pub collection: String,
}
