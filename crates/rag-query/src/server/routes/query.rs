//! Query endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{RagQueryRequest, RagResponse};

/// POST /rag-query - Answer a question from the collection
pub async fn rag_query(
    State(state): State<AppState>,
    Json(request): Json<RagQueryRequest>,
) -> Result<Json<RagResponse>> {
    let response = state.pipeline().run(&request).await?;
    Ok(Json(response))
}
