//! Tool trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

/// Uniform result of a dispatched tool call.
///
/// The registry converts every internal fault into a failed outcome; callers
/// never see a raw `ToolError`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    /// Structured payload when `success` is true.
    pub data: serde_json::Value,
    /// Failure reason when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    /// Create a successful outcome.
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    /// Create a failed outcome.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }
}

/// Trait for capabilities the reasoning loop can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, used as the `action` field in model output.
    fn name(&self) -> &str;

    /// Human-readable description rendered into prompts.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// Execute the tool with the given parameters.
    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value, ToolError>;
}
