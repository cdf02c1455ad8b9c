//! HTTP route handlers.
//!
//! All handlers are thin; playback logic lives in the engine.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::response::api_success;
use crate::api::ws::ws_handler;
use crate::api::AppState;
use crate::error::WavesyncResult;
use crate::playback::SongChange;
use crate::protocol_constants::SERVICE_ID;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws_handler))
        .route("/api/queue", get(get_queue))
        .route("/api/playback", get(get_playback))
        .route("/api/playback/next", post(handle_next))
        .route("/api/playback/previous", post(handle_previous))
        .route("/api/playback/pause", post(handle_pause))
        .route("/api/playback/resume", post(handle_resume))
        .route("/api/playlists/{id}/activate", post(handle_activate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe. Always 200 while the process is serving.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let queue = state.engine.queue();
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "listeners": state.hub.connection_count(),
        "playlist": queue.playlist().id,
        "paused": state.engine.is_paused(),
    }))
}

async fn get_queue(State(state): State<AppState>) -> impl IntoResponse {
    api_success(state.engine.queue_info())
}

async fn get_playback(State(state): State<AppState>) -> impl IntoResponse {
    api_success(state.engine.playback_snapshot())
}

async fn handle_next(State(state): State<AppState>) -> impl IntoResponse {
    api_success(state.engine.next().await)
}

async fn handle_previous(State(state): State<AppState>) -> impl IntoResponse {
    api_success(state.engine.previous().await)
}

async fn handle_pause(State(state): State<AppState>) -> impl IntoResponse {
    api_success(state.engine.pause().await)
}

async fn handle_resume(State(state): State<AppState>) -> impl IntoResponse {
    api_success(state.engine.resume().await)
}

async fn handle_activate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WavesyncResult<Json<SongChange>> {
    let change = state.engine.switch_playlist(&id).await?;
    Ok(Json(change))
}
