//! Pure state transition function

use super::state::{ScriptState, SessionContext};
use super::{Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ScriptState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ScriptState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition: the requested operation is not
/// valid in the current state. No state change happens on error.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("A conversation is already in progress (clear it first)")]
    ConversationActive,
    #[error("A turn request is already in flight")]
    RequestInFlight,
    #[error("No open turn to respond to")]
    NoOpenTurn,
    #[error("Nothing to retry")]
    NothingToRetry,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same state and event, always produces the same new state and
/// effects, with no I/O. The runtime executes the effects and feeds
/// collaborator outcomes back in as events.
pub fn transition(state: &ScriptState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Conversation start
        // ============================================================

        // AwaitingInput + StartRequested -> ResolvingContext
        (ScriptState::AwaitingInput, Event::StartRequested { business, customer }) => Ok(
            TransitionResult::new(ScriptState::ResolvingContext { business })
                .with_effect(Effect::ResolveContext { input: customer })
                .with_effect(Effect::notify_state_change("resolving_context")),
        ),

        (_, Event::StartRequested { .. }) => Err(TransitionError::ConversationActive),

        // Context resolved -> request the opening turn. The session context
        // is computed here once and reused unchanged for every later turn
        // request.
        (ScriptState::ResolvingContext { business }, Event::ContextResolved { customer }) => {
            let session = SessionContext {
                business: business.clone(),
                customer_context: customer.summary,
                customer_company_name: customer.company_name,
            };
            Ok(TransitionResult::new(ScriptState::GeneratingOpening)
                .with_effect(Effect::StoreSession { session })
                .with_effect(Effect::RequestOpeningTurn)
                .with_effect(Effect::notify_state_change("generating_opening")))
        }

        // Opening turn arrived -> conversation is open
        (ScriptState::GeneratingOpening, Event::TurnGenerated { turn }) => {
            let notify = Effect::notify_turn_ready(&turn);
            Ok(TransitionResult::new(ScriptState::TurnOpen { turn }).with_effect(notify))
        }

        // Start failed (resolution or opening generation): back to square
        // one, nothing to keep
        (
            ScriptState::ResolvingContext { .. } | ScriptState::GeneratingOpening,
            Event::GenerationFailed { message, retryable },
        ) => Ok(TransitionResult::new(ScriptState::AwaitingInput)
            .with_effect(Effect::ClearSession)
            .with_effect(Effect::notify_error(&message, retryable))),

        // ============================================================
        // Turn resolution
        // ============================================================

        // TurnOpen + ResponseSelected -> TurnResolving. The completed turn
        // is appended to history *before* the next-turn request is issued
        // and is never rolled back if that request fails.
        (ScriptState::TurnOpen { turn }, Event::ResponseSelected { option }) => {
            let completed = turn.clone().complete(option.clone());
            Ok(TransitionResult::new(ScriptState::TurnResolving {
                last_response: option.clone(),
            })
            .with_effect(Effect::AppendTurn { turn: completed })
            .with_effect(Effect::RequestNextTurn {
                last_response: option,
            })
            .with_effect(Effect::notify_state_change("turn_resolving")))
        }

        (
            ScriptState::ResolvingContext { .. }
            | ScriptState::GeneratingOpening
            | ScriptState::TurnResolving { .. },
            Event::ResponseSelected { .. },
        ) => Err(TransitionError::RequestInFlight),

        (
            ScriptState::AwaitingInput | ScriptState::Stalled { .. },
            Event::ResponseSelected { .. },
        ) => Err(TransitionError::NoOpenTurn),

        // Next turn arrived -> open it
        (ScriptState::TurnResolving { .. }, Event::TurnGenerated { turn }) => {
            let notify = Effect::notify_turn_ready(&turn);
            Ok(TransitionResult::new(ScriptState::TurnOpen { turn }).with_effect(notify))
        }

        // Next turn failed -> Stalled. History keeps the just-appended
        // entry; the same request can be re-issued via retry.
        (
            ScriptState::TurnResolving { last_response },
            Event::GenerationFailed { message, retryable },
        ) => {
            let notify = Effect::notify_error(&message, retryable);
            Ok(TransitionResult::new(ScriptState::Stalled {
                message,
                retryable,
                last_response: last_response.clone(),
            })
            .with_effect(notify))
        }

        // ============================================================
        // Retry and clear
        // ============================================================

        (ScriptState::Stalled { last_response, .. }, Event::RetryRequested) => Ok(
            TransitionResult::new(ScriptState::TurnResolving {
                last_response: last_response.clone(),
            })
            .with_effect(Effect::RequestNextTurn {
                last_response: last_response.clone(),
            })
            .with_effect(Effect::notify_state_change("turn_resolving")),
        ),

        (_, Event::RetryRequested) => Err(TransitionError::NothingToRetry),

        // Clear is valid from any state. Idempotent: clearing an already
        // cleared conversation lands in the same place.
        (_, Event::ClearRequested) => Ok(TransitionResult::new(ScriptState::AwaitingInput)
            .with_effect(Effect::ClearSession)
            .with_effect(Effect::notify_state_change("awaiting_input"))),

        // ============================================================
        // Stale collaborator results
        // ============================================================

        // A result for a request that was superseded (cleared mid-flight):
        // drop it without a state change.
        (_, event) if event.is_collaborator_result() => {
            Ok(TransitionResult::new(state.clone()))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} in {state:?}"
        ))),
    }
}
