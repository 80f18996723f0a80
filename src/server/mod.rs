//! HTTP API surface
//!
//! Thin axum layer over the pipeline: the classification endpoint, artifact
//! deletion, history clearing, a health surface, static artifact serving,
//! and the WebSocket upgrade.

mod ws;

pub use ws::ws_handler;

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::AriaError;
use crate::persona::PersonaConfig;
use crate::pipeline::ChatPipeline;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
    pub classifier: Arc<PersonaConfig>,
    pub companion: Arc<PersonaConfig>,
    pub generation_configured: bool,
    pub synthesis_configured: bool,
}

impl AppState {
    pub fn new(
        pipeline: Arc<ChatPipeline>,
        generation_configured: bool,
        synthesis_configured: bool,
    ) -> Self {
        Self {
            pipeline,
            classifier: Arc::new(PersonaConfig::classifier()),
            companion: Arc::new(PersonaConfig::companion()),
            generation_configured,
            synthesis_configured,
        }
    }
}

impl IntoResponse for AriaError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({ "success": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let audio_dir = state.pipeline.speech().audio_dir().to_path_buf();
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/audio/:filename", delete(delete_audio_handler))
        .route("/api/history/:session_id", delete(clear_history_handler))
        .route("/api/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .nest_service("/audio", ServeDir::new(audio_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Primary classification endpoint: full exchange under the classifier
/// persona.
async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, AriaError> {
    let outcome = state
        .pipeline
        .chat(&state.classifier, &request.message, request.session_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": outcome })))
}

/// Delete one speech artifact. Malformed names are rejected before any
/// filesystem access; a missing file reports `deleted: false`.
async fn delete_audio_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AriaError> {
    let deleted = state.pipeline.speech().delete_by_name(&filename).await?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

/// Clear a session's history. Always succeeds, even for unknown sessions.
async fn clear_history_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    state.pipeline.clear_history(&session_id);
    Json(json!({ "success": true, "sessionId": session_id }))
}

/// Informational status surface; no side effects.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "generationConfigured": state.generation_configured,
        "synthesisConfigured": state.synthesis_configured,
        "audioDirExists": state.pipeline.speech().audio_dir().is_dir(),
        "activeSessions": state.pipeline.sessions().session_count(),
    }))
}
