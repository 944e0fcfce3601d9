//! Conversation runtime executor

use super::{SessionEvent, SharedSnapshot, Snapshot};
use crate::generator::TurnGenerator;
use crate::resolver::ContextResolver;
use crate::state_machine::state::{CompletedScriptTurn, SessionContext};
use crate::state_machine::{transition, Effect, Event, ScriptState, TransitionError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Default deadline for a single collaborator call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const EVENT_CHANNEL_CAPACITY: usize = 32;
const BROADCAST_CHANNEL_CAPACITY: usize = 128;

/// Handle to interact with a running conversation
#[derive(Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<SessionEvent>,
    pub snapshot: SharedSnapshot,
}

impl SessionHandle {
    /// Send an event to the conversation runtime
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.event_tx
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {e}"))
    }

    /// Subscribe to conversation updates
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }
}

/// Generic conversation runtime that works with any resolver and generator
/// implementations
pub struct ScriptRuntime<R, G>
where
    R: ContextResolver + 'static,
    G: TurnGenerator + 'static,
{
    session_id: String,
    state: ScriptState,
    /// Computed once per conversation at start; reused unchanged for every
    /// turn request until cleared
    session: Option<SessionContext>,
    /// Completed turns in chronological order. Only grows, except via clear.
    history: Vec<CompletedScriptTurn>,
    resolver: Arc<R>,
    generator: Arc<G>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    snapshot: SharedSnapshot,
    /// The one collaborator task allowed in flight; aborted on clear so a
    /// superseded request cannot deliver into a new conversation
    inflight: Option<JoinHandle<()>>,
    request_timeout: Duration,
}

/// Spawn a conversation runtime and return its handle.
pub fn spawn_runtime<R, G>(resolver: R, generator: G, request_timeout: Duration) -> SessionHandle
where
    R: ContextResolver + 'static,
    G: TurnGenerator + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (broadcast_tx, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);
    let snapshot = SharedSnapshot::default();

    let runtime = ScriptRuntime {
        session_id: uuid::Uuid::new_v4().to_string(),
        state: ScriptState::default(),
        session: None,
        history: Vec::new(),
        resolver: Arc::new(resolver),
        generator: Arc::new(generator),
        event_rx,
        event_tx: event_tx.clone(),
        broadcast_tx: broadcast_tx.clone(),
        snapshot: snapshot.clone(),
        inflight: None,
        request_timeout,
    };

    tokio::spawn(runtime.run());

    SessionHandle {
        event_tx,
        broadcast_tx,
        snapshot,
    }
}

impl<R, G> ScriptRuntime<R, G>
where
    R: ContextResolver + 'static,
    G: TurnGenerator + 'static,
{
    pub async fn run(mut self) {
        tracing::info!(session_id = %self.session_id, "Starting conversation runtime");

        while let Some(event) = self.event_rx.recv().await {
            if let Err(e) = self.process_event(event).await {
                // Transition errors are user-facing (e.g. "no open turn")
                tracing::warn!(session_id = %self.session_id, error = %e, "Rejected event");
                let _ = self.broadcast_tx.send(SessionEvent {
                    event_type: "state_error".to_string(),
                    data: json!({ "message": e.to_string() }),
                });
            }
        }

        tracing::info!(session_id = %self.session_id, "Conversation runtime stopped");
    }

    async fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        // Pure state transition
        let result = transition(&self.state, event)?;
        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.snapshot.set(Snapshot {
            state: self.state.clone(),
            session: self.session.clone(),
            history: self.history.clone(),
        });

        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::ResolveContext { input } => {
                let resolver = Arc::clone(&self.resolver);
                let event_tx = self.event_tx.clone();
                let timeout = self.request_timeout;
                self.inflight = Some(tokio::spawn(async move {
                    let event =
                        match tokio::time::timeout(timeout, resolver.resolve(&input)).await {
                            Ok(Ok(customer)) => Event::ContextResolved { customer },
                            Ok(Err(e)) => Event::GenerationFailed {
                                message: e.to_string(),
                                retryable: e.is_retryable(),
                            },
                            Err(_) => Event::GenerationFailed {
                                message: format!(
                                    "Customer context resolution timed out after {}s",
                                    timeout.as_secs()
                                ),
                                retryable: true,
                            },
                        };
                    let _ = event_tx.send(event).await;
                }));
            }

            Effect::StoreSession { session } => {
                tracing::info!(
                    session_id = %self.session_id,
                    company = session.customer_company_name.as_deref().unwrap_or("<unknown>"),
                    "Session context resolved"
                );
                self.session = Some(session);
            }

            Effect::RequestOpeningTurn => {
                let Some(session) = self.session.clone() else {
                    // Unreachable through the state machine; fail the turn
                    // rather than hang the conversation
                    tracing::error!(session_id = %self.session_id, "No session context for opening turn");
                    self.send_failure("Internal error: no session context", false);
                    return;
                };
                let generator = Arc::clone(&self.generator);
                let event_tx = self.event_tx.clone();
                let timeout = self.request_timeout;
                self.inflight = Some(tokio::spawn(async move {
                    let event =
                        match tokio::time::timeout(timeout, generator.opening_turn(&session)).await
                        {
                            Ok(Ok(turn)) => Event::TurnGenerated { turn },
                            Ok(Err(e)) => Event::GenerationFailed {
                                message: e.to_string(),
                                retryable: e.is_retryable(),
                            },
                            Err(_) => Event::GenerationFailed {
                                message: format!(
                                    "Opening turn generation timed out after {}s",
                                    timeout.as_secs()
                                ),
                                retryable: true,
                            },
                        };
                    let _ = event_tx.send(event).await;
                }));
            }

            Effect::RequestNextTurn { last_response } => {
                let Some(session) = self.session.clone() else {
                    tracing::error!(session_id = %self.session_id, "No session context for next turn");
                    self.send_failure("Internal error: no session context", false);
                    return;
                };
                // Snapshot taken after AppendTurn ran, so it includes the
                // just-chosen response, in chronological order
                let history = self.history.clone();
                let generator = Arc::clone(&self.generator);
                let event_tx = self.event_tx.clone();
                let timeout = self.request_timeout;
                self.inflight = Some(tokio::spawn(async move {
                    let event = match tokio::time::timeout(
                        timeout,
                        generator.next_turn(&session, &history, &last_response),
                    )
                    .await
                    {
                        Ok(Ok(turn)) => Event::TurnGenerated { turn },
                        Ok(Err(e)) => Event::GenerationFailed {
                            message: e.to_string(),
                            retryable: e.is_retryable(),
                        },
                        Err(_) => Event::GenerationFailed {
                            message: format!(
                                "Next turn generation timed out after {}s",
                                timeout.as_secs()
                            ),
                            retryable: true,
                        },
                    };
                    let _ = event_tx.send(event).await;
                }));
            }

            Effect::AppendTurn { turn } => {
                self.history.push(turn);
            }

            Effect::ClearSession => {
                if let Some(handle) = self.inflight.take() {
                    handle.abort();
                }
                self.session = None;
                self.history.clear();
            }

            Effect::NotifyClient { event_type, data } => {
                let _ = self.broadcast_tx.send(SessionEvent { event_type, data });
            }
        }
    }

    fn send_failure(&self, message: &str, retryable: bool) {
        let event_tx = self.event_tx.clone();
        let message = message.to_string();
        tokio::spawn(async move {
            let _ = event_tx
                .send(Event::GenerationFailed { message, retryable })
                .await;
        });
    }
}
