//! Runtime for executing a conversation
//!
//! A single actor owns the conversation: it consumes events from an mpsc
//! queue, applies the pure transition function, and executes the resulting
//! effects. Collaborator calls run as spawned tasks that feed their outcome
//! back into the same queue, so operations on one conversation are strictly
//! sequential and two turn requests can never be in flight at once.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::{spawn_runtime, ScriptRuntime, SessionHandle, DEFAULT_REQUEST_TIMEOUT};

use crate::state_machine::state::{CompletedScriptTurn, ScriptTurn, SessionContext};
use crate::state_machine::ScriptState;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};

/// Event sent to connected clients
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub event_type: String,
    pub data: Value,
}

/// Read-only snapshot of a conversation, refreshed by the runtime after
/// every transition
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub state: ScriptState,
    pub session: Option<SessionContext>,
    pub history: Vec<CompletedScriptTurn>,
}

impl Snapshot {
    /// The open turn, if any
    pub fn current_turn(&self) -> Option<&ScriptTurn> {
        self.state.open_turn()
    }
}

/// Shared handle to the latest snapshot
#[derive(Debug, Clone, Default)]
pub struct SharedSnapshot(Arc<RwLock<Snapshot>>);

impl SharedSnapshot {
    pub fn get(&self) -> Snapshot {
        self.0.read().expect("snapshot lock poisoned").clone()
    }

    fn set(&self, snapshot: Snapshot) {
        *self.0.write().expect("snapshot lock poisoned") = snapshot;
    }
}
