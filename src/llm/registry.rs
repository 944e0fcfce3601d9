//! Model registry for managing available LLM providers

use super::{AnthropicModel, AnthropicService, LlmService, LoggingService};
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration for LLM providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    /// Gateway base URL; when set, authentication is handled upstream
    pub gateway: Option<String>,
    /// Default model ID
    pub default_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            gateway: std::env::var("LLM_GATEWAY").ok(),
            default_model: std::env::var("DEFAULT_MODEL").ok(),
        }
    }
}

/// Registry of available LLM models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    /// Create an empty registry for testing purposes
    pub fn new_empty() -> Self {
        Self {
            services: HashMap::new(),
            default_model: "test-model".to_string(),
        }
    }

    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        // In gateway mode the gateway handles the actual authentication
        let api_key = if config.gateway.is_some() {
            Some("implicit".to_string())
        } else {
            config
                .anthropic_api_key
                .clone()
                .filter(|key| !key.is_empty())
        };

        if let Some(api_key) = api_key {
            for model in AnthropicModel::ALL {
                if let Ok(service) =
                    AnthropicService::new(api_key.clone(), *model, config.gateway.as_deref())
                {
                    services.insert(
                        model.model_id().to_string(),
                        Arc::new(LoggingService::new(Arc::new(service))),
                    );
                }
            }
        }

        let default_model = config
            .default_model
            .clone()
            .or_else(|| {
                if services.contains_key("claude-4.5-sonnet") {
                    Some("claude-4.5-sonnet".to_string())
                } else {
                    services.keys().next().cloned()
                }
            })
            .unwrap_or_else(|| "claude-4.5-sonnet".to_string());

        Self {
            services,
            default_model,
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    /// Get the default model ID
    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    /// Check if any models are available
    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }

    /// Get a cheap/fast model for auxiliary tasks like website summarization.
    /// Falls back to the default model when no fast model is configured.
    pub fn fast_model(&self) -> Option<Arc<dyn LlmService>> {
        self.get("claude-4.5-haiku").or_else(|| self.default())
    }
}
