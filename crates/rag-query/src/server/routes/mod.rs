//! Routes for the RAG query server

pub mod health;
pub mod query;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::server::state::AppState;

/// Build all routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/rag-query", post(query::rag_query))
        .route("/health", get(health::health))
        .route("/info", get(info))
}

/// Service info endpoint
async fn info(State(state): State<AppState>) -> Json<Value> {
    let config = state.config();
    let pipeline = state.pipeline();
    Json(json!({
        "name": "rag-query",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Retrieval-augmented answers with query expansion and cross-encoder rerank",
        "models": {
            "embed": pipeline.embed_model(),
            "chat": pipeline.chat_model(),
            "expand": config.ollama.expand_model,
        },
        "collection": pipeline.default_collection(),
        "defaults": {
            "topK": pipeline.retrieval().default_top_k,
            "topN": pipeline.retrieval().default_top_n,
        },
        "endpoints": {
            "POST /rag-query": "Answer a question from the collection",
            "GET /health": "Reachability of Ollama and Qdrant",
            "GET /info": "This document"
        }
    }))
}
