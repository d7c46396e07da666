//! Shared helpers: throw-away HTTP servers impersonating the AI services

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rag_query::config::RagConfig;
use rag_query::transport::RetryPolicy;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL of a port nothing listens on
pub async fn closed_port() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Short timeouts and near-zero backoff so tests stay fast
pub fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff_factor: 0.01,
        max_backoff: Duration::from_millis(100),
        connect_timeout: Duration::from_secs(1),
        read_timeout: Duration::from_secs(2),
        ..RetryPolicy::default()
    }
}

/// Attempt counter shared with a mock handler
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// How the mock answers each service
#[derive(Clone)]
pub struct MockBehavior {
    /// Stored scores of the returned hits; `None` omits the score
    pub search_scores: Vec<Option<f64>>,
    /// Cross-encoder scores, or `None` to answer 500
    pub rerank_scores: Option<Vec<f64>>,
    /// Hold each rerank reply this long before answering
    pub rerank_delay: Option<Duration>,
    /// Fail every chat call with 500
    pub chat_fails: bool,
    /// Reply of `/api/generate`
    pub expansion: String,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            search_scores: vec![Some(0.9), Some(0.8), Some(0.7), Some(0.6), Some(0.5)],
            rerank_scores: Some(vec![0.3, 0.1, 0.9, 0.4, 0.2]),
            rerank_delay: None,
            chat_fails: false,
            expansion: "definition of X".to_string(),
        }
    }
}

/// Requests the mock received, for assertions
#[derive(Clone, Default)]
pub struct Recorded {
    pub embed_inputs: Arc<Mutex<Vec<String>>>,
    pub searches: Arc<Mutex<Vec<(String, Value)>>>,
    pub rerank_pairs: Arc<Mutex<Vec<Value>>>,
    pub chats: Arc<Mutex<Vec<Value>>>,
    pub chat_hits: Hits,
}

#[derive(Clone)]
struct MockState {
    behavior: MockBehavior,
    recorded: Recorded,
}

/// One server answering for Ollama, Qdrant and the cross-encoder
pub async fn spawn_services(behavior: MockBehavior) -> (String, Recorded) {
    let recorded = Recorded::default();
    let state = MockState {
        behavior,
        recorded: recorded.clone(),
    };

    let router = Router::new()
        .route("/", get(|| async { "Ollama is running" }))
        .route("/api/embed", post(embed))
        .route("/api/generate", post(generate))
        .route("/api/chat", post(chat))
        .route("/collections", get(|| async { Json(json!({"result": {"collections": []}})) }))
        .route("/collections/:collection/points/search", post(search))
        .route("/rerank", post(rerank))
        .with_state(state);

    (spawn(router).await, recorded)
}

/// Config pointing every service at `base`
pub fn config_for(base: &str) -> RagConfig {
    let mut config = RagConfig::default();
    config.ollama.base_url = base.to_string();
    config.qdrant.base_url = base.to_string();
    config.reranker.url = format!("{}/rerank", base);
    config.http.retries = 1;
    config.http.backoff_factor = 0.0;
    config.http.connect_timeout_secs = 1;
    config.http.read_timeout_secs = 5;
    config.http.health_timeout_secs = 1;
    config
}

async fn embed(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    let input = body["input"].as_str().unwrap_or_default().to_string();
    state.recorded.embed_inputs.lock().unwrap().push(input);
    Json(json!({"model": body["model"], "embeddings": [[0.1, 0.2, 0.3]]}))
}

async fn generate(State(state): State<MockState>) -> Json<Value> {
    Json(json!({"response": state.behavior.expansion, "done": true}))
}

async fn chat(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.recorded.chat_hits.bump();
    state.recorded.chats.lock().unwrap().push(body);
    if state.behavior.chat_fails {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "model crashed"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "model": "llama3.1:8b",
            "message": {"role": "assistant", "content": "X is Y [1]"},
            "done": true
        })),
    )
}

async fn search(
    State(state): State<MockState>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state
        .recorded
        .searches
        .lock()
        .unwrap()
        .push((collection, body.clone()));

    let limit = body["limit"].as_u64().unwrap_or(10) as usize;
    let hits: Vec<Value> = state
        .behavior
        .search_scores
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, score)| {
            let mut hit = json!({
                "id": format!("doc-{}", i),
                "payload": {"text": format!("Document {} says X is Y.", i), "source": "kb"}
            });
            if let Some(score) = score {
                hit["score"] = json!(score);
            }
            hit
        })
        .collect();

    Json(json!({"result": hits, "status": "ok", "time": 0.001}))
}

async fn rerank(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.recorded.rerank_pairs.lock().unwrap().push(body["pairs"].clone());
    if let Some(delay) = state.behavior.rerank_delay {
        tokio::time::sleep(delay).await;
    }
    match &state.behavior.rerank_scores {
        Some(scores) => (StatusCode::OK, Json(json!({ "scores": scores }))),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "model not loaded"})),
        ),
    }
}
