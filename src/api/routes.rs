//! HTTP routes for the chat API.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::types::{ChatRequest, ChatResponse, HealthResponse};
use crate::agent::Agent;
use crate::session::SessionStore;

/// Shared application state.
pub struct AppState {
    pub agent: Agent,
    pub sessions: SessionStore,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/sessions/:id", delete(reset_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message must not be empty".to_string()));
    }

    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let output = state
        .agent
        .run_session_turn(&state.sessions, &session_id, message)
        .await;

    Ok(Json(ChatResponse {
        session_id,
        answer: output.answer,
        rounds: output.rounds,
        log: output.log,
    }))
}

async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if state.sessions.reset(&id).await {
        Ok(Json(serde_json::json!({ "ok": true })))
    } else {
        Err((StatusCode::NOT_FOUND, format!("session {} not found", id)))
    }
}
