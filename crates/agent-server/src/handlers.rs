//! HTTP Handlers

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use agent_core::Message;
use agent_mcp::{JsonRpcRequest, McpSession};
use weather_tools::weather_registry;

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ollama_connected: bool,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ollama_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ollama_connected,
    })
}

/// Protocol endpoint. Each request gets its own session over a fresh
/// tool registry; the session is torn down as soon as the response is
/// produced, so no protocol state survives between requests.
pub async fn mcp_handler(
    State(state): State<AppState>,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    let registry = Arc::new(weather_registry(state.api.clone()));
    let mut session = McpSession::new(registry);

    let response = session.handle(request).await;
    session.close();

    match response {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        // Notifications carry no response body.
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Direct question endpoint: one completion, no tools.
pub async fn question_handler(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<AnswerResponse>, (StatusCode, Response)> {
    let user = match payload.get("user").and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => {
            let errors = ValidationErrors {
                errors: vec![FieldError {
                    field: "user".into(),
                    message: "user must be a non-empty string".into(),
                }],
            };
            return Err((StatusCode::BAD_REQUEST, Json(errors).into_response()));
        }
    };

    let messages = [Message::user(user)];
    match state
        .provider
        .complete(&messages, &[], &state.options)
        .await
    {
        Ok(completion) => Ok(Json(AnswerResponse {
            answer: completion.content,
        })),
        Err(e) => {
            tracing::error!("Question completion failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    code: "PROVIDER_ERROR".into(),
                })
                .into_response(),
            ))
        }
    }
}
