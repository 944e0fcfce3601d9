//! API request and response types

use crate::state_machine::state::{
    CompletedScriptTurn, ProspectResponseOption, ResponseType, ScriptTurn, SessionContext,
};
use crate::state_machine::ScriptState;
use serde::{Deserialize, Serialize};

/// Request to select a prospect response on the open turn
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    pub response_text: String,
    pub response_type: ResponseType,
}

impl RespondRequest {
    pub fn into_option(self) -> ProspectResponseOption {
        ProspectResponseOption {
            response_text: self.response_text,
            response_type: self.response_type,
        }
    }
}

/// Response for dispatched actions; the outcome arrives via the snapshot
/// and the event stream
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Full conversation snapshot
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSnapshotResponse {
    pub state: ScriptState,
    pub session: Option<SessionContext>,
    pub history: Vec<CompletedScriptTurn>,
    pub current_turn: Option<ScriptTurn>,
}

/// Response for model list
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
    pub default: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            field: None,
        }
    }

    pub fn with_field(message: impl Into<String>, field: &str) -> Self {
        Self {
            error: message.into(),
            field: Some(field.to_string()),
        }
    }
}
