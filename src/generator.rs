//! Script turn generation
//!
//! Turns LLM completions into validated `ScriptTurn` values for both the
//! opening of a conversation and every subsequent turn.

use crate::llm::{extract_json_object, LlmError, LlmService};
use crate::prompts;
use crate::state_machine::state::{
    CompletedScriptTurn, ProspectResponseOption, ScriptTurn, SessionContext,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Errors from turn generation
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("The model did not return a valid script turn")]
    NoOutput,

    #[error("The model returned a malformed script turn: {0}")]
    InvalidTurn(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl GenerateError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerateError::Llm(e) => e.kind.is_retryable(),
            _ => false,
        }
    }
}

/// Generates script turns from session context and conversation history
#[async_trait]
pub trait TurnGenerator: Send + Sync {
    /// Generate the opening turn of a conversation
    async fn opening_turn(&self, session: &SessionContext) -> Result<ScriptTurn, GenerateError>;

    /// Generate the next turn, addressing the just-chosen prospect response.
    /// History is passed in strict chronological order and never reordered
    /// or truncated.
    async fn next_turn(
        &self,
        session: &SessionContext,
        history: &[CompletedScriptTurn],
        last_response: &ProspectResponseOption,
    ) -> Result<ScriptTurn, GenerateError>;
}

#[async_trait]
impl<T: TurnGenerator + ?Sized> TurnGenerator for Arc<T> {
    async fn opening_turn(&self, session: &SessionContext) -> Result<ScriptTurn, GenerateError> {
        (**self).opening_turn(session).await
    }

    async fn next_turn(
        &self,
        session: &SessionContext,
        history: &[CompletedScriptTurn],
        last_response: &ProspectResponseOption,
    ) -> Result<ScriptTurn, GenerateError> {
        (**self).next_turn(session, history, last_response).await
    }
}

/// Production generator backed by an LLM service
pub struct LlmTurnGenerator {
    llm: Arc<dyn LlmService>,
}

impl LlmTurnGenerator {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl TurnGenerator for LlmTurnGenerator {
    async fn opening_turn(&self, session: &SessionContext) -> Result<ScriptTurn, GenerateError> {
        let request = prompts::build_opening_request(session);
        let response = self.llm.complete(&request).await?;
        let text = response.non_empty_text().ok_or(GenerateError::NoOutput)?;
        parse_turn(text)
    }

    async fn next_turn(
        &self,
        session: &SessionContext,
        history: &[CompletedScriptTurn],
        last_response: &ProspectResponseOption,
    ) -> Result<ScriptTurn, GenerateError> {
        let request = prompts::build_next_turn_request(session, history, last_response);
        let response = self.llm.complete(&request).await?;
        let text = response.non_empty_text().ok_or(GenerateError::NoOutput)?;
        parse_turn(text)
    }
}

/// Parse and validate a script turn from model output text.
fn parse_turn(text: &str) -> Result<ScriptTurn, GenerateError> {
    let json = extract_json_object(text).ok_or(GenerateError::NoOutput)?;
    let turn: ScriptTurn =
        serde_json::from_str(json).map_err(|e| GenerateError::InvalidTurn(e.to_string()))?;
    validate_turn(&turn)?;
    Ok(turn)
}

fn validate_turn(turn: &ScriptTurn) -> Result<(), GenerateError> {
    if turn.salesperson_utterance.trim().is_empty() {
        return Err(GenerateError::InvalidTurn(
            "empty salesperson utterance".to_string(),
        ));
    }

    let count = turn.prospect_response_options.len();
    if !(ScriptTurn::MIN_RESPONSE_OPTIONS..=ScriptTurn::MAX_RESPONSE_OPTIONS).contains(&count) {
        return Err(GenerateError::InvalidTurn(format!(
            "expected {} to {} prospect response options, got {count}",
            ScriptTurn::MIN_RESPONSE_OPTIONS,
            ScriptTurn::MAX_RESPONSE_OPTIONS,
        )));
    }

    if turn
        .prospect_response_options
        .iter()
        .any(|option| option.response_text.trim().is_empty())
    {
        return Err(GenerateError::InvalidTurn(
            "empty prospect response text".to_string(),
        ));
    }

    Ok(())
}
