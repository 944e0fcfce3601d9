//! Effects produced by state transitions

use crate::resolver::CustomerInput;
use crate::state_machine::state::{
    CompletedScriptTurn, ProspectResponseOption, ScriptTurn, SessionContext,
};
use serde_json::{json, Value};

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Resolve the customer context (fetch + summarize, or text heuristics)
    ResolveContext { input: CustomerInput },

    /// Install the resolved session context in the runtime
    StoreSession { session: SessionContext },

    /// Request the opening turn from the generator
    RequestOpeningTurn,

    /// Request the next turn, addressing the just-chosen prospect response
    RequestNextTurn {
        last_response: ProspectResponseOption,
    },

    /// Append a completed turn to history
    AppendTurn { turn: CompletedScriptTurn },

    /// Discard session context and history, aborting any in-flight request
    ClearSession,

    /// Notify connected clients
    NotifyClient { event_type: String, data: Value },
}

impl Effect {
    pub fn notify_state_change(state: &str) -> Self {
        Effect::NotifyClient {
            event_type: "state_change".to_string(),
            data: json!({ "state": state }),
        }
    }

    pub fn notify_turn_ready(turn: &ScriptTurn) -> Self {
        Effect::NotifyClient {
            event_type: "turn_ready".to_string(),
            data: serde_json::to_value(turn).unwrap_or(Value::Null),
        }
    }

    pub fn notify_error(message: &str, retryable: bool) -> Self {
        Effect::NotifyClient {
            event_type: "error".to_string(),
            data: json!({ "message": message, "retryable": retryable }),
        }
    }
}
