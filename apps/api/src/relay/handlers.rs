//! Axum route handlers for the chat relay.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};

use crate::errors::AppError;
use crate::models::chat::{ChatRequest, ChatResponse};
use crate::relay::relay_chat;
use crate::state::AppState;

/// POST /chat
///
/// Forwards one user message plus the caller's transcript to the provider and
/// returns the reply with the extended transcript.
pub async fn handle_chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let request = parse_request(&body)?;
    let response = relay_chat(&state, request).await?;
    Ok(Json(response))
}

/// Parses the body as JSON regardless of `Content-Type`. An empty body reads as `{}`.
fn parse_request(body: &[u8]) -> Result<ChatRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ChatRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))
}

/// OPTIONS /chat
///
/// Cross-origin pre-flight. Empty body; the CORS headers are added by the router.
pub async fn handle_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Any other method on /chat.
pub async fn handle_method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
