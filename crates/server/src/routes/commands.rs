//! Command, typing and chat endpoints used by the phone app

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    routing::post,
};
use jarvis::{ActionOutcome, RequestContext, Source};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{AppState, error::ApiError};

/// Opts a caller into two-turn confirmation under its own session. Without it
/// destructive commands must carry "confirm" in the same request.
pub const SESSION_HEADER: &str = "x-jarvis-session";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/command", post(handle_command))
        .route("/type", post(type_text))
        .route("/ask", post(ask))
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TypeRequest {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    pub action: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub requires_confirmation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ActionOutcome> for CommandResponse {
    fn from(outcome: ActionOutcome) -> Self {
        Self {
            success: outcome.success,
            action: outcome.action_label,
            message: outcome.spoken_response,
            details: outcome.details.unwrap_or_else(|| json!({})),
            requires_confirmation: outcome.requires_confirmation,
            error: outcome.error_message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TypeResponse {
    pub success: bool,
    pub action: String,
    pub message: String,
    pub characters_typed: usize,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub success: bool,
    pub response: String,
    pub action: String,
}

/// Pulls a required string field out of a JSON body; a body that is not JSON
/// at all counts as missing the field
fn required<T>(
    body: Result<Json<T>, JsonRejection>,
    field: &str,
    get: impl FnOnce(T) -> Option<String>,
) -> Result<String, ApiError> {
    let body = body.map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection);
        ApiError::BadRequest(format!("Missing '{}' field", field))
    })?;
    get(body.0).ok_or_else(|| ApiError::BadRequest(format!("Missing '{}' field", field)))
}

async fn handle_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = required(body, "command", |b| b.command)?;

    let ctx = match headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
    {
        Some(session) => RequestContext::new(Source::Phone).with_session(session.trim()),
        None => RequestContext::new(Source::Phone).same_utterance_only(),
    };

    let outcome = state.dispatcher.handle_in(&command, &ctx).await;
    Ok(Json(outcome.into()))
}

async fn type_text(
    State(state): State<AppState>,
    body: Result<Json<TypeRequest>, JsonRejection>,
) -> Result<Json<TypeResponse>, ApiError> {
    let text = required(body, "text", |b| b.text)?;

    let outcome = state.dispatcher.type_text(&text, Source::Phone).await;
    let characters_typed = if outcome.success {
        outcome.characters_typed.unwrap_or(0)
    } else {
        0
    };

    Ok(Json(TypeResponse {
        success: outcome.success,
        action: outcome.action_label,
        message: outcome.spoken_response,
        characters_typed,
    }))
}

async fn ask(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let message = required(body, "message", |b| b.message)?;

    let outcome = state.dispatcher.ask(&message, Source::Phone).await;
    Ok(Json(AskResponse {
        success: outcome.success,
        response: outcome.spoken_response,
        action: "chat".to_string(),
    }))
}
