//! Pipeline entities and response types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload key holding a document's text
pub const TEXT_FIELD: &str = "text";

/// One match returned by vector search, before reranking
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Point id, rendered as a string
    pub id: String,
    /// Stored payload
    pub payload: Map<String, Value>,
    /// Vector-store similarity, used only when rerank fails
    pub score: Option<f64>,
}

impl VectorRecord {
    /// Normalize one raw search hit. A missing id falls back to the hit's
    /// position; a non-object payload becomes empty.
    pub fn from_point(position: usize, point: &Value) -> Self {
        let id = match point.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => position.to_string(),
        };
        let payload = match point.get("payload") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        let score = point.get("score").and_then(Value::as_f64);

        Self { id, payload, score }
    }

    /// Document text from the payload, or empty
    pub fn text(&self) -> &str {
        payload_text(&self.payload)
    }

    /// Stored score, `0.0` when absent
    pub fn fallback_score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// `text` field of a payload, or empty
pub fn payload_text(payload: &Map<String, Value>) -> &str {
    payload
        .get(TEXT_FIELD)
        .and_then(Value::as_str)
        .unwrap_or("")
}

/// (query text, candidate text) scored by the cross-encoder.
/// Serializes as a two-element array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankPair(pub String, pub String);

impl RerankPair {
    pub fn new(query: impl Into<String>, candidate: impl Into<String>) -> Self {
        Self(query.into(), candidate.into())
    }

    pub fn query(&self) -> &str {
        &self.0
    }

    pub fn candidate(&self) -> &str {
        &self.1
    }
}

/// A vector record with its relevance score attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDoc {
    pub id: String,
    pub rerank: f64,
    pub payload: Map<String, Value>,
}

impl RankedDoc {
    pub fn text(&self) -> &str {
        payload_text(&self.payload)
    }
}

/// Body returned by `POST /rag-query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    /// Generated answer
    pub answer: String,
    /// Chat model that produced the answer
    pub model_used: String,
    /// Reranked documents, best first
    #[serde(rename = "topDocs")]
    pub top_docs: Vec<RankedDoc>,
    /// Numbered context shown to the chat model
    pub context: String,
}

/// Reachability of one dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Up,
    Down,
}

impl From<bool> for DependencyStatus {
    fn from(up: bool) -> Self {
        if up {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// Overall service status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Ok,
    Degraded,
}

/// Body returned by `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: ServiceStatus,
    pub ollama: DependencyStatus,
    pub qdrant: DependencyStatus,
}

impl HealthCheck {
    /// `ok` only when every dependency is up
    pub fn from_probes(ollama_up: bool, qdrant_up: bool) -> Self {
        let status = if ollama_up && qdrant_up {
            ServiceStatus::Ok
        } else {
            ServiceStatus::Degraded
        };
        Self {
            status,
            ollama: ollama_up.into(),
            qdrant: qdrant_up.into(),
        }
    }
}
