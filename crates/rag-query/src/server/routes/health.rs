//! Dependency health endpoint

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::types::{HealthCheck, ServiceStatus};

/// GET /health - Reachability of Ollama and Qdrant. Always 200.
pub async fn health(State(state): State<AppState>) -> Json<HealthCheck> {
    let health = state.pipeline().health().await;
    if health.status == ServiceStatus::Degraded {
        tracing::warn!(ollama = ?health.ollama, qdrant = ?health.qdrant, "Service degraded");
    }
    Json(health)
}
