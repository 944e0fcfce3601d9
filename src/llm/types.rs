//! Common types for LLM interactions

/// LLM request
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// System prompt, if any
    pub system: Option<String>,
    pub messages: Vec<LlmMessage>,
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    /// Build a single-user-message request with a system prompt.
    pub fn with_system(system: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            messages: vec![LlmMessage::user(user_text)],
            max_tokens: None,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Message in conversation
#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub text: String,
}

impl LlmMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    #[allow(dead_code)] // Constructor for API completeness
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Concatenated text content of the response
    pub text: String,
    pub usage: Usage,
}

impl LlmResponse {
    /// Trimmed response text, `None` when the model returned nothing usable.
    pub fn non_empty_text(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

/// Usage statistics
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Locate the JSON object in model output text.
///
/// Models occasionally wrap the requested JSON in a fenced code block or
/// surrounding prose; strict parsing happens downstream, this only trims
/// to the outermost braces.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
