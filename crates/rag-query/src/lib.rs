//! rag-query: retrieval-augmented question answering over Ollama and Qdrant
//!
//! A query is optionally expanded by an LLM, embedded, searched in a Qdrant
//! collection, reranked by a cross-encoder and answered by a chat model from
//! numbered context blocks. Every outbound call runs under a shared retry
//! policy; expansion and rerank degrade gracefully, while embedding, search
//! and generation failures abort the request with the failing stage named.

pub mod config;
pub mod error;
pub mod generation;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod transport;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result, Stage};
pub use retrieval::{RagPipeline, StageOutcome};
pub use types::{RagQueryRequest, RagResponse, RankedDoc, VectorRecord};
