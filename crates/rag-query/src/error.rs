//! Error types for the RAG query service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::transport::CallError;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage that talks to an upstream service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Optional query expansion (non-fatal)
    Expansion,
    /// Query embedding (fatal)
    Embedding,
    /// Vector search (fatal)
    VectorSearch,
    /// Cross-encoder rerank (non-fatal)
    Rerank,
    /// Answer generation (fatal)
    Generation,
}

impl Stage {
    /// Short detail returned to HTTP callers when this stage aborts a request
    pub fn failure_detail(&self) -> &'static str {
        match self {
            Stage::Expansion => "Query expansion failed",
            Stage::Embedding => "Embedding failed",
            Stage::VectorSearch => "Vector search failed",
            Stage::Rerank => "Rerank failed",
            Stage::Generation => "Chat model failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Expansion => "query expansion",
            Stage::Embedding => "embedding",
            Stage::VectorSearch => "vector search",
            Stage::Rerank => "rerank",
            Stage::Generation => "generation",
        };
        f.write_str(name)
    }
}

/// RAG query service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prompt template error
    #[error("Prompt template error: {0}")]
    Template(String),

    /// Outbound call failed after the retry budget was spent
    #[error("Upstream call failed: {0}")]
    Call(#[from] CallError),

    /// Upstream answered with a body none of the known layouts match
    #[error("Unrecognized {service} response shape: {detail}")]
    UnrecognizedShape {
        service: &'static str,
        detail: String,
    },

    /// A fatal pipeline stage failed; the request is aborted
    #[error("{stage} stage failed: {source}")]
    Upstream {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template(message.into())
    }

    /// Create a shape-normalization error
    pub fn unrecognized_shape(service: &'static str, detail: impl Into<String>) -> Self {
        Self::UnrecognizedShape {
            service,
            detail: detail.into(),
        }
    }

    /// Wrap an error as the failure of a fatal stage
    pub fn upstream(stage: Stage, source: Error) -> Self {
        Self::Upstream {
            stage,
            source: Box::new(source),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The stage that aborted the request, if this is a stage failure
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Upstream { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, stage, message) = match &self {
            Error::Upstream { stage, .. } => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                Some(*stage),
                stage.failure_detail().to_string(),
            ),
            Error::Call(err) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                None,
                err.to_string(),
            ),
            Error::UnrecognizedShape { .. } => (
                StatusCode::BAD_GATEWAY,
                "shape_error",
                None,
                self.to_string(),
            ),
            Error::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                None,
                msg.clone(),
            ),
            Error::Template(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "template_error",
                None,
                msg.clone(),
            ),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                None,
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", None, err.to_string()),
            Error::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                None,
                msg.clone(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "stage": stage,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
