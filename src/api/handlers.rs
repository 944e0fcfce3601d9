//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ErrorResponse, ModelsResponse, QueuedResponse, RespondRequest, ScriptSnapshotResponse,
    SuccessResponse,
};
use super::AppState;
use crate::runtime::SessionEvent;
use crate::state_machine::{Event, ScriptState};
use crate::transcript::{format_transcript, TRANSCRIPT_FILE_NAME};
use crate::validation::{validate, StartRequest, ValidationError};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Conversation lifecycle
        .route("/api/script/start", post(start_conversation))
        .route("/api/script/respond", post(select_response))
        .route("/api/script/retry", post(retry_next_turn))
        .route("/api/script/clear", post(clear_conversation))
        // Conversation retrieval
        .route("/api/script", get(get_script))
        .route("/api/script/stream", get(stream_script))
        .route("/api/script/transcript", get(download_transcript))
        // Service info
        .route("/api/models", get(list_models))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Conversation Lifecycle
// ============================================================

/// Validate start inputs and dispatch the start request. Collaborator
/// failures surface through the snapshot and the event stream.
async fn start_conversation(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    let (business, customer) = validate(request)?;

    // The runtime is authoritative, but rejecting here gives the caller a
    // synchronous error for the common case
    let snapshot = state.session.snapshot.get();
    if snapshot.state != ScriptState::AwaitingInput {
        return Err(AppError::Conflict(
            "A conversation is already in progress (clear it first)".to_string(),
        ));
    }

    state
        .session
        .send(Event::StartRequested { business, customer })
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(QueuedResponse { queued: true }))
}

/// Select a prospect response on the open turn.
async fn select_response(
    State(state): State<AppState>,
    Json(request): Json<RespondRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    let snapshot = state.session.snapshot.get();
    match &snapshot.state {
        ScriptState::TurnOpen { .. } => {}
        current if current.is_busy() => {
            return Err(AppError::Conflict(
                "A turn request is already in flight".to_string(),
            ));
        }
        _ => {
            return Err(AppError::Conflict("No open turn to respond to".to_string()));
        }
    }

    state
        .session
        .send(Event::ResponseSelected {
            option: request.into_option(),
        })
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(QueuedResponse { queued: true }))
}

/// Re-issue the failed next-turn request of a stalled conversation.
async fn retry_next_turn(
    State(state): State<AppState>,
) -> Result<Json<QueuedResponse>, AppError> {
    let snapshot = state.session.snapshot.get();
    if !matches!(snapshot.state, ScriptState::Stalled { .. }) {
        return Err(AppError::Conflict("Nothing to retry".to_string()));
    }

    state
        .session
        .send(Event::RetryRequested)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(QueuedResponse { queued: true }))
}

/// Discard the conversation. Valid in any state.
async fn clear_conversation(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .session
        .send(Event::ClearRequested)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Conversation Retrieval
// ============================================================

async fn get_script(State(state): State<AppState>) -> Json<ScriptSnapshotResponse> {
    let snapshot = state.session.snapshot.get();
    let current_turn = snapshot.current_turn().cloned();
    Json(ScriptSnapshotResponse {
        state: snapshot.state,
        session: snapshot.session,
        history: snapshot.history,
        current_turn,
    })
}

async fn stream_script(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.session.snapshot.get();
    let init = SessionEvent {
        event_type: "init".to_string(),
        data: serde_json::to_value(&snapshot).unwrap_or(serde_json::Value::Null),
    };
    sse_stream(init, state.session.subscribe())
}

async fn download_transcript(State(state): State<AppState>) -> Response {
    let snapshot = state.session.snapshot.get();
    let transcript = format_transcript(&snapshot);

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{TRANSCRIPT_FILE_NAME}\""),
            ),
        ],
        transcript,
    )
        .into_response()
}

// ============================================================
// Service Info
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.models.available_models(),
        default: state.models.default_model_id().to_string(),
    })
}

async fn get_version() -> Json<serde_json::Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

// ============================================================
// Error Handling
// ============================================================

/// API error with HTTP status mapping
#[derive(Debug)]
enum AppError {
    /// Field-level validation failure (400)
    Validation(ValidationError),
    /// Operation invalid in the current state (409)
    Conflict(String),
    /// Unexpected failure (500)
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_field(err.message.clone(), err.field)),
            )
                .into_response(),
            AppError::Conflict(message) => (
                StatusCode::CONFLICT,
                Json(ErrorResponse::new(message)),
            )
                .into_response(),
            AppError::Internal(message) => {
                tracing::error!(error = %message, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(message)),
                )
                    .into_response()
            }
        }
    }
}
