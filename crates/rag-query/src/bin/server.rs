//! RAG query server binary
//!
//! Run with: cargo run -p rag-query --bin rag-query-server

use std::sync::Arc;
use std::time::Duration;

use rag_query::{
    config::RagConfig,
    generation::OllamaClient,
    retrieval::RagPipeline,
    server::RagServer,
    transport::{ResilientClient, RetryPolicy},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RagConfig::load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("rag_query={},tower_http=info", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                    RAG Query Service                      ║
║        Expansion · Vector Search · Rerank · Answer        ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    tracing::info!("Configuration loaded");
    tracing::info!("  - Ollama: {}", config.ollama.base_url);
    tracing::info!("  - Qdrant: {} (collection {})", config.qdrant.base_url, config.qdrant.collection);
    tracing::info!("  - Cross-encoder: {}", config.reranker.url);
    tracing::info!("  - Embedding model: {}", config.ollama.embed_model);
    tracing::info!("  - Chat model: {}", config.ollama.chat_model);
    tracing::info!("  - Expansion model: {}", config.ollama.expand_model);
    tracing::info!(
        "  - Retries: {} (backoff factor {}s)",
        config.http.retries,
        config.http.backoff_factor
    );

    let http = ResilientClient::new(RetryPolicy::from_config(&config.http))?;
    let ollama = Arc::new(OllamaClient::new(
        http.clone(),
        &config.ollama,
        Duration::from_secs(config.http.health_timeout_secs),
    ));

    // Make sure every model is present before serving
    for model in config.required_models() {
        ollama.ensure_model(&model).await?;
    }

    let pipeline = RagPipeline::with_clients(&config, http, ollama)?;
    let server = RagServer::with_pipeline(config, pipeline);

    println!("\nServer starting...");
    println!("  Query:  POST http://{}/rag-query", server.address());
    println!("  Health: GET  http://{}/health", server.address());
    println!("  Info:   GET  http://{}/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
