//! Core types for the RAG query service

pub mod query;
pub mod response;

pub use query::{RagQuery, RagQueryRequest};
pub use response::{
    DependencyStatus, HealthCheck, RagResponse, RankedDoc, RerankPair, ServiceStatus,
    VectorRecord,
};
