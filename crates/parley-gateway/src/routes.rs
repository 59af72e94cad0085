use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::State;
use axum::Json;
use parley_core::validate_non_empty;
use parley_sandbox::ExecutionStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on a caller-supplied execution deadline.
pub const MAX_EXECUTE_TIMEOUT_SECS: u64 = 300;

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User message, must not be blank.
    pub message: String,
    /// Conversation identifier, must not be blank.
    pub session_id: String,
}

/// Reply to `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Assistant reply.
    pub response: String,
}

/// Body of `POST /execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Script source.
    pub code: String,
    /// Defaults to the sandbox's configured timeout; capped at
    /// [`MAX_EXECUTE_TIMEOUT_SECS`].
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Reply to `POST /execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    /// Composed output or sentinel.
    pub output: String,
    /// Outcome classification.
    pub status: ExecutionStatus,
    /// Process exit code, if the script exited normally.
    pub exit_code: Option<i32>,
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// `POST /chat`
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state
        .orchestrator
        .chat(&req.message, &req.session_id)
        .await?;
    Ok(Json(ChatResponse { response }))
}

/// Sandbox failures are results, so this only errors on an empty script.
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    validate_non_empty("code", &req.code)?;

    let timeout_secs = req
        .timeout_secs
        .unwrap_or(state.sandbox.config().default_timeout_secs)
        .min(MAX_EXECUTE_TIMEOUT_SECS);
    let result = state
        .sandbox
        .run(&req.code, Duration::from_secs(timeout_secs))
        .await;

    Ok(Json(ExecuteResponse {
        output: result.output,
        status: result.status,
        exit_code: result.exit_code,
    }))
}
