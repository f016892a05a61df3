//! Error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors from LLM providers.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed ({provider}): {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("LLM returned an invalid response ({provider}): {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Missing credentials for LLM provider {provider}")]
    MissingCredentials { provider: String },

    #[error("Rate limited by LLM provider {provider}")]
    RateLimited { provider: String },
}

/// Errors from the state stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Alert {0} not found")]
    AlertNotFound(Uuid),

    #[error("No monitor exists for {0}")]
    MonitorNotFound(String),

    #[error("Monitor for {0} is already active")]
    MonitorAlreadyActive(String),

    #[error("Monitor for {0} is already stopped")]
    MonitorAlreadyStopped(String),
}

/// Errors surfaced by the analysis orchestrator.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Every attempt, including retries, ended without a final answer.
    #[error("Analysis failed after {attempts} attempts: {last_cause}")]
    Exhausted { attempts: u32, last_cause: String },

    /// The query did not name a recognizable ticker.
    #[error("Could not identify a stock ticker in the query")]
    NoTicker,
}
