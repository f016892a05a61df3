//! Provider trait and request types.

use async_trait::async_trait;

use crate::error::LlmError;

/// A single-turn generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Full prompt text (system instructions included by the caller).
    pub prompt: String,
    /// Model identifier. `None` uses the provider's default model.
    pub model: Option<String>,
    /// Sampling temperature. `None` uses the provider's default.
    pub temperature: Option<f64>,
}

impl GenerateRequest {
    /// Create a request with provider defaults for model and temperature.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            temperature: None,
        }
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override the temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Trait for text-generation providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a text response for the given request.
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError>;

    /// Default model identifier, for diagnostics.
    fn model_name(&self) -> &str;
}
