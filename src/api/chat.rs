//! Chat and session reset endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::{Deserialize, Serialize};

use super::{ApiState, error::ApiError};
use crate::conversation::{DEFAULT_SESSION_ID, Turn};
use crate::detect::LanguageDetector;
use crate::llm::Reply;

/// Chat request body
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub session_id: Option<String>,
}

/// Chat response body
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    /// Detected language code
    pub language: &'static str,
    /// Display name of the detected language
    pub language_name: &'static str,
    /// Set when the reply is the fallback text
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

/// Reset request body; an empty body resets the default session
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: &'static str,
}

fn session_or_default(session_id: Option<String>) -> String {
    session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string())
}

/// Detect language, generate a reply with session context, record the exchange
async fn chat(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;

    let message = request
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("No message provided"))?;
    let session_id = session_or_default(request.session_id);

    let language = state.detector.detect(&message);
    tracing::info!(session_id = %session_id, language, "chat message received");

    // Held across the upstream call so turns from one session never interleave
    let session = state.store.session(&session_id);
    let mut conversation = session.lock().await;

    let reply = state
        .generator
        .generate(&message, language, conversation.turns())
        .await;

    if let Reply::Degraded { reason, .. } = &reply {
        tracing::warn!(session_id = %session_id, reason = %reason, "returning fallback reply");
    }

    // Fallback replies are recorded like generated ones
    conversation.push(Turn::user(message));
    conversation.push(Turn::assistant(reply.text().to_string()));
    drop(conversation);

    Ok(Json(ChatResponse {
        degraded: reply.is_degraded(),
        response: reply.text().to_string(),
        language,
        language_name: LanguageDetector::display_name(language),
    }))
}

/// Clear a session's history
async fn reset(State(state): State<Arc<ApiState>>, body: Bytes) -> Result<Json<ResetResponse>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ResetRequest::default()
    } else {
        serde_json::from_slice::<ResetRequest>(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?
    };

    let session_id = session_or_default(request.session_id);
    state.store.reset(&session_id).await;
    tracing::info!(session_id = %session_id, "conversation reset");

    Ok(Json(ResetResponse { status: "reset" }))
}

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/reset", post(reset))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_session_id_uses_default() {
        assert_eq!(session_or_default(None), DEFAULT_SESSION_ID);
        assert_eq!(session_or_default(Some(String::new())), DEFAULT_SESSION_ID);
        assert_eq!(session_or_default(Some("abc".to_string())), "abc");
    }

    #[test]
    fn chat_request_rejects_unknown_fields() {
        assert!(serde_json::from_str::<ChatRequest>(r#"{"message":"hi","mode":"x"}"#).is_err());
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.message.as_deref(), Some("hi"));
        assert!(req.session_id.is_none());
    }

    #[test]
    fn degraded_flag_only_serialized_when_set() {
        let ok = ChatResponse {
            response: "hi".to_string(),
            language: "en",
            language_name: "English",
            degraded: false,
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert!(json.get("degraded").is_none());

        let degraded = ChatResponse { degraded: true, ..ok };
        assert_eq!(serde_json::to_value(&degraded).unwrap()["degraded"], true);
    }
}
