//! Events that trigger state transitions

use crate::resolver::{CustomerContext, CustomerInput};
use crate::state_machine::state::{BusinessInfo, ProspectResponseOption, ScriptTurn};

/// Events that trigger state transitions
///
/// User events come from the API layer; collaborator events are fed back by
/// the runtime when a resolution or generation task finishes.
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    StartRequested {
        business: BusinessInfo,
        customer: CustomerInput,
    },
    ResponseSelected {
        option: ProspectResponseOption,
    },
    RetryRequested,
    ClearRequested,

    // Collaborator events
    ContextResolved {
        customer: CustomerContext,
    },
    TurnGenerated {
        turn: ScriptTurn,
    },
    GenerationFailed {
        message: String,
        retryable: bool,
    },
}

impl Event {
    /// Whether this event reports the outcome of a collaborator request.
    /// Such events can arrive late when the request they answer has been
    /// superseded by a clear.
    pub fn is_collaborator_result(&self) -> bool {
        matches!(
            self,
            Event::ContextResolved { .. }
                | Event::TurnGenerated { .. }
                | Event::GenerationFailed { .. }
        )
    }
}
