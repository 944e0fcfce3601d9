//! Mock implementations for testing
//!
//! These mocks enable integration testing of the conversation runtime
//! without real I/O.

use super::executor::{spawn_runtime, SessionHandle};
use super::SessionEvent;
use crate::generator::{GenerateError, TurnGenerator};
use crate::resolver::{ContextResolver, CustomerContext, CustomerInput, ResolveError};
use crate::state_machine::state::{
    BusinessInfo, CompletedScriptTurn, ProspectResponseOption, ScriptTurn, SessionContext,
};
use crate::state_machine::Event;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Mock Resolver
// ============================================================================

/// Mock resolver that returns queued results
pub struct MockResolver {
    responses: Mutex<VecDeque<Result<CustomerContext, ResolveError>>>,
    /// Record of all inputs resolved
    pub requests: Mutex<Vec<CustomerInput>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_ok(&self, context: CustomerContext) {
        self.responses.lock().unwrap().push_back(Ok(context));
    }

    pub fn queue_err(&self, error: ResolveError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }
}

impl Default for MockResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextResolver for MockResolver {
    async fn resolve(&self, input: &CustomerInput) -> Result<CustomerContext, ResolveError> {
        self.requests.lock().unwrap().push(input.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ResolveError::NoOutput))
    }
}

// ============================================================================
// Mock Generator
// ============================================================================

/// Mock turn generator serving queued turns to both the opening and
/// next-turn paths, recording every request
pub struct MockGenerator {
    turns: Mutex<VecDeque<Result<ScriptTurn, GenerateError>>>,
    pub opening_requests: Mutex<Vec<SessionContext>>,
    pub next_requests: Mutex<Vec<(Vec<CompletedScriptTurn>, ProspectResponseOption)>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            opening_requests: Mutex::new(Vec::new()),
            next_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_turn(&self, turn: ScriptTurn) {
        self.turns.lock().unwrap().push_back(Ok(turn));
    }

    pub fn queue_err(&self, error: GenerateError) {
        self.turns.lock().unwrap().push_back(Err(error));
    }

    fn pop(&self) -> Result<ScriptTurn, GenerateError> {
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerateError::NoOutput))
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TurnGenerator for MockGenerator {
    async fn opening_turn(&self, session: &SessionContext) -> Result<ScriptTurn, GenerateError> {
        self.opening_requests.lock().unwrap().push(session.clone());
        self.pop()
    }

    async fn next_turn(
        &self,
        _session: &SessionContext,
        history: &[CompletedScriptTurn],
        last_response: &ProspectResponseOption,
    ) -> Result<ScriptTurn, GenerateError> {
        self.next_requests
            .lock()
            .unwrap()
            .push((history.to_vec(), last_response.clone()));
        self.pop()
    }
}

// ============================================================================
// Delayed Mock Generator (for in-flight state testing)
// ============================================================================

/// Mock generator with a configurable delay before answering, for tests
/// that need to observe an in-flight request
pub struct DelayedMockGenerator {
    inner: MockGenerator,
    delay: Duration,
}

impl DelayedMockGenerator {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockGenerator::new(),
            delay,
        }
    }

    pub fn queue_turn(&self, turn: ScriptTurn) {
        self.inner.queue_turn(turn);
    }
}

#[async_trait]
impl TurnGenerator for DelayedMockGenerator {
    async fn opening_turn(&self, session: &SessionContext) -> Result<ScriptTurn, GenerateError> {
        tokio::time::sleep(self.delay).await;
        self.inner.opening_turn(session).await
    }

    async fn next_turn(
        &self,
        session: &SessionContext,
        history: &[CompletedScriptTurn],
        last_response: &ProspectResponseOption,
    ) -> Result<ScriptTurn, GenerateError> {
        tokio::time::sleep(self.delay).await;
        self.inner.next_turn(session, history, last_response).await
    }
}

// ============================================================================
// Test Session
// ============================================================================

/// A running runtime plus the handles tests need
pub struct TestSession {
    pub handle: SessionHandle,
    pub broadcast_rx: broadcast::Receiver<SessionEvent>,
}

pub fn start_test_session<R, G>(resolver: R, generator: G) -> TestSession
where
    R: ContextResolver + 'static,
    G: TurnGenerator + 'static,
{
    let handle = spawn_runtime(resolver, generator, Duration::from_secs(5));
    let broadcast_rx = handle.subscribe();
    TestSession {
        handle,
        broadcast_rx,
    }
}

impl TestSession {
    pub async fn start_conversation(&self) {
        self.handle
            .send(Event::StartRequested {
                business: test_business(),
                customer: CustomerInput::Text {
                    text: "Company Name: Acme Corp\nWe sell widgets.".to_string(),
                },
            })
            .await
            .expect("send start");
    }

    pub async fn select(&self, option: ProspectResponseOption) {
        self.handle
            .send(Event::ResponseSelected { option })
            .await
            .expect("send response");
    }

    /// Poll the snapshot until the predicate holds
    pub async fn wait_until(
        &self,
        timeout: Duration,
        predicate: impl Fn(&super::Snapshot) -> bool,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if predicate(&self.handle.snapshot.get()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Wait for a broadcast event of the given type
    pub async fn wait_for_event(&mut self, event_type: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await {
                Ok(Ok(event)) if event.event_type == event_type => return true,
                _ => continue,
            }
        }
        false
    }
}

pub fn test_business() -> BusinessInfo {
    BusinessInfo {
        user_name: "Jo".to_string(),
        business_name: "Acme Outreach".to_string(),
        product_service: "CRM software".to_string(),
        sales_goals: "schedule a demo".to_string(),
    }
}

pub fn test_context() -> CustomerContext {
    CustomerContext {
        summary: "Company Name: Acme Corp\nWe sell widgets.".to_string(),
        company_name: Some("Acme Corp".to_string()),
    }
}

pub fn test_turn(utterance: &str) -> ScriptTurn {
    ScriptTurn {
        salesperson_utterance: utterance.to_string(),
        prospect_response_options: vec![
            ProspectResponseOption {
                response_text: "Okay, what is it?".to_string(),
                response_type: crate::state_machine::state::ResponseType::Neutral,
            },
            ProspectResponseOption {
                response_text: "Not interested.".to_string(),
                response_type: crate::state_machine::state::ResponseType::NegativeObjection,
            },
        ],
    }
}

pub fn objection() -> ProspectResponseOption {
    ProspectResponseOption {
        response_text: "Not interested.".to_string(),
        response_type: crate::state_machine::state::ResponseType::NegativeObjection,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::ScriptState;
    use std::sync::Arc;

    const WAIT: Duration = Duration::from_secs(2);

    /// Integration test: start resolves context, generates the opening turn,
    /// and opens the conversation with an empty history.
    #[tokio::test]
    async fn test_start_opens_conversation() {
        let resolver = MockResolver::new();
        resolver.queue_ok(test_context());
        let generator = MockGenerator::new();
        generator.queue_turn(test_turn("Hi, this is Jo from Acme Outreach."));

        let session = start_test_session(resolver, generator);
        session.start_conversation().await;

        assert!(
            session
                .wait_until(WAIT, |snap| snap.current_turn().is_some())
                .await
        );

        let snapshot = session.handle.snapshot.get();
        assert!(snapshot.history.is_empty());
        let turn = snapshot.current_turn().unwrap();
        assert_eq!(turn.salesperson_utterance, "Hi, this is Jo from Acme Outreach.");
        assert!(turn.prospect_response_options.len() >= 2);

        let context = snapshot.session.as_ref().unwrap();
        assert_eq!(context.customer_company_name.as_deref(), Some("Acme Corp"));
        assert_eq!(context.business.user_name, "Jo");
    }

    /// Integration test: selecting a response appends to history and opens
    /// the next generated turn. The generator sees the full chronological
    /// history including the just-chosen response.
    #[tokio::test]
    async fn test_select_response_advances_conversation() {
        let resolver = MockResolver::new();
        resolver.queue_ok(test_context());
        let generator = Arc::new(MockGenerator::new());
        generator.queue_turn(test_turn("Hi, this is Jo."));
        generator.queue_turn(test_turn("Totally understand. Can I ask one quick question?"));

        let session = start_test_session(resolver, generator.clone());
        session.start_conversation().await;
        assert!(
            session
                .wait_until(WAIT, |snap| snap.current_turn().is_some())
                .await
        );

        session.select(objection()).await;

        assert!(
            session
                .wait_until(WAIT, |snap| {
                    snap.history.len() == 1 && snap.current_turn().is_some()
                })
                .await
        );

        let snapshot = session.handle.snapshot.get();
        let completed = &snapshot.history[0];
        assert_eq!(completed.salesperson_utterance, "Hi, this is Jo.");
        assert!(completed.prospect_response_options.is_empty());
        assert_eq!(completed.chosen_prospect_response, objection());
        assert_eq!(
            snapshot.current_turn().unwrap().salesperson_utterance,
            "Totally understand. Can I ask one quick question?"
        );

        // The next-turn request carried the appended history and the chosen
        // response
        let next_requests = generator.next_requests.lock().unwrap();
        assert_eq!(next_requests.len(), 1);
        let (history, last) = &next_requests[0];
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].chosen_prospect_response, objection());
        assert_eq!(last, &objection());
    }

    /// Integration test: a failed next-turn request stalls the conversation
    /// without rolling back history; retry re-issues the same request.
    #[tokio::test]
    async fn test_failed_next_turn_stalls_then_retries() {
        let resolver = MockResolver::new();
        resolver.queue_ok(test_context());
        let generator = Arc::new(MockGenerator::new());
        generator.queue_turn(test_turn("Hi, this is Jo."));
        generator.queue_err(GenerateError::NoOutput);
        generator.queue_turn(test_turn("Glad you asked."));

        let session = start_test_session(resolver, generator.clone());
        session.start_conversation().await;
        assert!(
            session
                .wait_until(WAIT, |snap| snap.current_turn().is_some())
                .await
        );

        session.select(objection()).await;

        assert!(
            session
                .wait_until(WAIT, |snap| matches!(snap.state, ScriptState::Stalled { .. }))
                .await
        );

        // The chosen response is already fixed in history
        let snapshot = session.handle.snapshot.get();
        assert_eq!(snapshot.history.len(), 1);
        assert!(snapshot.current_turn().is_none());

        session.handle.send(Event::RetryRequested).await.unwrap();

        assert!(
            session
                .wait_until(WAIT, |snap| snap.current_turn().is_some())
                .await
        );

        let snapshot = session.handle.snapshot.get();
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(
            snapshot.current_turn().unwrap().salesperson_utterance,
            "Glad you asked."
        );

        // Both requests saw the same last response
        let next_requests = generator.next_requests.lock().unwrap();
        assert_eq!(next_requests.len(), 2);
        assert_eq!(next_requests[0].1, next_requests[1].1);
    }

    /// Integration test: selecting a response while the previous one is
    /// still resolving is rejected as a state error.
    #[tokio::test]
    async fn test_select_while_resolving_is_rejected() {
        let resolver = MockResolver::new();
        resolver.queue_ok(test_context());
        let generator = DelayedMockGenerator::new(Duration::from_secs(5));
        generator.queue_turn(test_turn("Hi, this is Jo."));

        let mut session = start_test_session(resolver, generator);
        session.start_conversation().await;

        // Wait for the opening request to be in flight, then try to respond
        assert!(
            session
                .wait_until(WAIT, |snap| snap.state == ScriptState::GeneratingOpening)
                .await
        );
        session.select(objection()).await;

        assert!(session.wait_for_event("state_error", WAIT).await);

        // No history entry was created by the rejected selection
        assert!(session.handle.snapshot.get().history.is_empty());
    }

    /// Integration test: a failed start returns to AwaitingInput.
    #[tokio::test]
    async fn test_failed_start_returns_to_awaiting_input() {
        let resolver = MockResolver::new();
        resolver.queue_err(ResolveError::NoOutput);
        let generator = MockGenerator::new();

        let mut session = start_test_session(resolver, generator);
        session.start_conversation().await;

        assert!(session.wait_for_event("error", WAIT).await);
        let snapshot = session.handle.snapshot.get();
        assert_eq!(snapshot.state, ScriptState::AwaitingInput);
        assert!(snapshot.session.is_none());
        assert!(snapshot.history.is_empty());
    }

    /// Integration test: clear discards everything and is idempotent; a
    /// request superseded by clear never delivers a turn.
    #[tokio::test]
    async fn test_clear_discards_conversation() {
        let resolver = MockResolver::new();
        resolver.queue_ok(test_context());
        let generator = DelayedMockGenerator::new(Duration::from_millis(200));
        generator.queue_turn(test_turn("Hi, this is Jo."));

        let session = start_test_session(resolver, generator);
        session.start_conversation().await;

        assert!(
            session
                .wait_until(WAIT, |snap| snap.state == ScriptState::GeneratingOpening)
                .await
        );

        session.handle.send(Event::ClearRequested).await.unwrap();
        assert!(
            session
                .wait_until(WAIT, |snap| snap.state == ScriptState::AwaitingInput)
                .await
        );

        // Give the aborted request time to have delivered, were it alive
        tokio::time::sleep(Duration::from_millis(400)).await;
        let snapshot = session.handle.snapshot.get();
        assert_eq!(snapshot.state, ScriptState::AwaitingInput);
        assert!(snapshot.current_turn().is_none());
        assert!(snapshot.session.is_none());

        // Second clear is a no-op
        session.handle.send(Event::ClearRequested).await.unwrap();
        assert!(
            session
                .wait_until(WAIT, |snap| snap.state == ScriptState::AwaitingInput)
                .await
        );
    }

    /// Integration test: history grows by one per successful selection and
    /// resets only via clear.
    #[tokio::test]
    async fn test_history_grows_monotonically() {
        let resolver = MockResolver::new();
        resolver.queue_ok(test_context());
        let generator = MockGenerator::new();
        generator.queue_turn(test_turn("Turn one."));
        generator.queue_turn(test_turn("Turn two."));
        generator.queue_turn(test_turn("Turn three."));

        let session = start_test_session(resolver, generator);
        session.start_conversation().await;
        assert!(
            session
                .wait_until(WAIT, |snap| snap.current_turn().is_some())
                .await
        );

        for expected_len in 1..=2 {
            session.select(objection()).await;
            assert!(
                session
                    .wait_until(WAIT, |snap| {
                        snap.history.len() == expected_len && snap.current_turn().is_some()
                    })
                    .await
            );
        }

        session.handle.send(Event::ClearRequested).await.unwrap();
        assert!(
            session
                .wait_until(WAIT, |snap| snap.history.is_empty()
                    && snap.state == ScriptState::AwaitingInput)
                .await
        );
    }
}
