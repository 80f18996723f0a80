//! WebSocket message surface
//!
//! Exposes the pipeline's operations as discrete message types. An
//! unrecognized or malformed message yields an error reply; the
//! connection stays open.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::pipeline::{ChatOutcome, TtsOutcome};

use super::AppState;

/// Messages a client may send
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Plain conversation under the companion persona
    Chat {
        message: String,
        #[serde(rename = "sessionId")]
        session_id: Option<String>,
    },
    /// Full classification under the classifier persona
    ChatSmart {
        message: String,
        #[serde(rename = "sessionId")]
        session_id: Option<String>,
    },
    /// Synthesize arbitrary text
    Tts { text: String },
    /// React to a named meal
    MealReaction {
        meal: String,
        #[serde(rename = "sessionId")]
        session_id: Option<String>,
    },
    ClearHistory {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Ping,
}

/// Messages the server sends back
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Emitted before a generation call starts
    Progress { stage: &'static str },
    ChatResult { data: Box<ChatOutcome> },
    TtsResult { data: TtsOutcome },
    HistoryCleared {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Pong,
    Error { message: String },
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    tracing::info!("websocket client connected");

    while let Some(Ok(msg)) = socket.recv().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let replies = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(message) => handle_message(&state, message).await,
            Err(e) => vec![ServerMessage::Error {
                message: format!("unrecognized message: {}", e),
            }],
        };

        for reply in replies {
            let json = match serde_json::to_string(&reply) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize reply");
                    continue;
                }
            };
            if socket.send(Message::Text(json)).await.is_err() {
                tracing::info!("websocket client disconnected");
                return;
            }
        }
    }

    tracing::info!("websocket client disconnected");
}

/// Dispatch one message to the pipeline, collecting progress and result
/// replies. Operation errors become error replies, never disconnects.
async fn handle_message(state: &AppState, message: ClientMessage) -> Vec<ServerMessage> {
    match message {
        ClientMessage::Chat {
            message,
            session_id,
        } => {
            let progress = ServerMessage::Progress { stage: "thinking" };
            match state
                .pipeline
                .chat(&state.companion, &message, session_id)
                .await
            {
                Ok(data) => vec![progress, ServerMessage::ChatResult { data: Box::new(data) }],
                Err(e) => vec![progress, error_reply(e)],
            }
        }
        ClientMessage::ChatSmart {
            message,
            session_id,
        } => {
            let progress = ServerMessage::Progress { stage: "thinking" };
            match state
                .pipeline
                .chat(&state.classifier, &message, session_id)
                .await
            {
                Ok(data) => vec![progress, ServerMessage::ChatResult { data: Box::new(data) }],
                Err(e) => vec![progress, error_reply(e)],
            }
        }
        ClientMessage::Tts { text } => {
            match state.pipeline.tts(&text, &state.companion.voice_id).await {
                Ok(data) => vec![ServerMessage::TtsResult { data }],
                Err(e) => vec![error_reply(e)],
            }
        }
        ClientMessage::MealReaction { meal, session_id } => {
            let progress = ServerMessage::Progress { stage: "thinking" };
            match state
                .pipeline
                .meal_reaction(&state.companion, &meal, session_id)
                .await
            {
                Ok(data) => vec![progress, ServerMessage::ChatResult { data: Box::new(data) }],
                Err(e) => vec![progress, error_reply(e)],
            }
        }
        ClientMessage::ClearHistory { session_id } => {
            state.pipeline.clear_history(&session_id);
            vec![ServerMessage::HistoryCleared { session_id }]
        }
        ClientMessage::Ping => vec![ServerMessage::Pong],
    }
}

fn error_reply(e: crate::error::AriaError) -> ServerMessage {
    ServerMessage::Error {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::mock::ScriptedBackend;
    use crate::pipeline::ChatPipeline;
    use crate::session::{PacingGate, SessionStore};
    use crate::speech::SpeechArtifactManager;
    use std::sync::Arc;
    use std::time::Duration;

    fn state(replies: Vec<&str>, dir: &std::path::Path) -> AppState {
        let pipeline = ChatPipeline::new(
            Arc::new(SessionStore::new()),
            Arc::new(PacingGate::new(Duration::ZERO)),
            Arc::new(ScriptedBackend::new(replies)),
            Arc::new(SpeechArtifactManager::new(None, dir, "/audio")),
        );
        AppState::new(Arc::new(pipeline), true, false)
    }

    #[test]
    fn test_client_message_tags() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"chat_smart","message":"hi","sessionId":"s"}"#)
                .unwrap();
        assert!(matches!(msg, ClientMessage::ChatSmart { .. }));
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let dir = tempfile::tempdir().unwrap();
        let replies = handle_message(&state(vec![], dir.path()), ClientMessage::Ping).await;
        assert!(matches!(replies[0], ServerMessage::Pong));
    }

    #[tokio::test]
    async fn test_chat_emits_progress_then_result() {
        let dir = tempfile::tempdir().unwrap();
        let s = state(vec!["[MOOD: happy] [RESPONSE: hi!]"], dir.path());
        let replies = handle_message(
            &s,
            ClientMessage::Chat {
                message: "hello".into(),
                session_id: Some("s".into()),
            },
        )
        .await;
        assert!(matches!(replies[0], ServerMessage::Progress { .. }));
        assert!(matches!(replies[1], ServerMessage::ChatResult { .. }));
    }

    #[tokio::test]
    async fn test_failed_chat_emits_error_reply() {
        let dir = tempfile::tempdir().unwrap();
        let replies = handle_message(
            &state(vec![], dir.path()),
            ClientMessage::Chat {
                message: "hello".into(),
                session_id: None,
            },
        )
        .await;
        assert!(matches!(replies[1], ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn test_clear_history_reply() {
        let dir = tempfile::tempdir().unwrap();
        let replies = handle_message(
            &state(vec![], dir.path()),
            ClientMessage::ClearHistory {
                session_id: "s".into(),
            },
        )
        .await;
        assert!(matches!(replies[0], ServerMessage::HistoryCleared { .. }));
    }
}
