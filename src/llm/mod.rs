//! LLM integration.
//!
//! The agent only needs single-turn text generation: prompt in, text out,
//! with a per-call model id and temperature. Tool dispatch is handled by the
//! ReAct loop itself (the model emits JSON actions), so there is no function
//! calling surface here.

mod gemini;
pub mod mock;
mod provider;

pub use gemini::GeminiProvider;
pub use provider::{GenerateRequest, LlmProvider};

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Create the LLM provider from configuration.
pub fn create_llm_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    tracing::info!(
        "Using Google Gemini (AI Studio), default model {}",
        config.model
    );
    Ok(Arc::new(GeminiProvider::new(config.clone())?))
}
