//! Chat endpoint streaming orchestrator events as SSE.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use gatehouse_core::{ChatMessage, RunOptions};
use serde::Deserialize;
use tokio_stream::StreamExt;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Header carrying the session id of a chat response.
pub const SESSION_HEADER: &str = "x-session-id";

/// Request body for a chat turn.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Session for permission grants. A new one is created when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Conversation history, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Name of an agent profile restricting the run.
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

/// Handle chat requests.
///
/// Accepts POST with a [`ChatRequest`] body and returns an SSE stream with
/// one `data:` line per orchestrator event. Closing the connection stops
/// the run.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ServerResult<impl IntoResponse> {
    if request.messages.is_empty() {
        return Err(ServerError::InvalidRequest(
            "messages must not be empty".to_string(),
        ));
    }
    if request.max_iterations == Some(0) {
        return Err(ServerError::InvalidRequest(
            "max_iterations must be at least 1".to_string(),
        ));
    }

    let mut options = RunOptions::new();
    if let Some(name) = &request.agent {
        let profile = state
            .profile(name)
            .cloned()
            .ok_or_else(|| ServerError::NotFound(format!("Unknown agent: {}", name)))?;
        options = options.with_agent(profile);
    }
    if let Some(max) = request.max_iterations {
        options = options.with_max_iterations(max);
    }

    let session_id = request
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::info!(
        session_id = %session_id,
        agent = request.agent.as_deref(),
        messages = request.messages.len(),
        "chat started"
    );

    let events = state.orchestrator.process_message_with(
        session_id.clone(),
        request.messages,
        state.broker.clone(),
        options,
    );

    let stream = events.map(|event| {
        let json = serde_json::to_string(&event).unwrap_or_else(|e| {
            serde_json::json!({
                "type": "error",
                "message": format!("Failed to serialize event: {}", e)
            })
            .to_string()
        });
        Ok::<_, Infallible>(SseEvent::default().data(json))
    });

    Ok((
        [(SESSION_HEADER, session_id)],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    ))
}

#[cfg(test)]
#[path = "chat_tests.rs"]
mod tests;
