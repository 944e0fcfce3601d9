//! Conversation state types

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Script Turn Types - The units of the generated conversation
// ============================================================================

/// Sentiment category of a prospect response option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Interest
    Positive,
    /// Inquiry or deferral
    Neutral,
    /// Disinterest or an objection
    NegativeObjection,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Positive => "positive",
            ResponseType::Neutral => "neutral",
            ResponseType::NegativeObjection => "negative_objection",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One plausible prospect reply, offered to the user as a choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProspectResponseOption {
    pub response_text: String,
    pub response_type: ResponseType,
}

/// A generated turn: what the salesperson says, plus the prospect replies
/// the user can pick from to steer the next turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptTurn {
    pub salesperson_utterance: String,
    pub prospect_response_options: Vec<ProspectResponseOption>,
}

impl ScriptTurn {
    pub const MIN_RESPONSE_OPTIONS: usize = 2;
    pub const MAX_RESPONSE_OPTIONS: usize = 4;

    /// Fix this turn in history with the user's chosen prospect response.
    /// The response options are cleared; a completed turn is never mutated
    /// afterwards.
    pub fn complete(self, chosen: ProspectResponseOption) -> CompletedScriptTurn {
        CompletedScriptTurn {
            salesperson_utterance: self.salesperson_utterance,
            prospect_response_options: Vec::new(),
            chosen_prospect_response: chosen,
        }
    }
}

/// A turn fixed in history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedScriptTurn {
    pub salesperson_utterance: String,
    /// Always empty once a turn is completed
    pub prospect_response_options: Vec<ProspectResponseOption>,
    pub chosen_prospect_response: ProspectResponseOption,
}

// ============================================================================
// Session Context
// ============================================================================

/// Salesperson-side inputs, validated before a conversation starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfo {
    pub user_name: String,
    pub business_name: String,
    pub product_service: String,
    pub sales_goals: String,
}

/// Context for a conversation, computed once at start and reused unchanged
/// for every subsequent turn request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub business: BusinessInfo,
    /// Normalized customer summary used to personalize generated text
    pub customer_context: String,
    pub customer_company_name: Option<String>,
}

// ============================================================================
// Conversation State
// ============================================================================

/// Conversation state
///
/// At most one turn is open at any time. History lives in the runtime and
/// only grows; the states below carry just the data the next transition
/// needs.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptState {
    /// No conversation yet; waiting for validated start inputs
    #[default]
    AwaitingInput,

    /// Customer context resolution in flight
    ResolvingContext { business: BusinessInfo },

    /// Opening-turn request in flight
    GeneratingOpening,

    /// Current turn has unresolved response options
    TurnOpen { turn: ScriptTurn },

    /// A response was chosen and appended to history; next-turn request in
    /// flight
    TurnResolving { last_response: ProspectResponseOption },

    /// A next-turn request failed. The chosen response is already fixed in
    /// history; a retry re-issues the request for the same last response.
    Stalled {
        message: String,
        retryable: bool,
        last_response: ProspectResponseOption,
    },
}

impl ScriptState {
    /// Check if a collaborator request is in flight
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            ScriptState::ResolvingContext { .. }
                | ScriptState::GeneratingOpening
                | ScriptState::TurnResolving { .. }
        )
    }

    /// The open turn, if any
    pub fn open_turn(&self) -> Option<&ScriptTurn> {
        match self {
            ScriptState::TurnOpen { turn } => Some(turn),
            _ => None,
        }
    }
}
