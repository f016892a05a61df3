//! Scripted provider for tests.
//!
//! Returns queued responses in order; once the script is exhausted every call
//! fails, which doubles as a model-failure fixture.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::provider::{GenerateRequest, LlmProvider};

/// Scripted LLM provider.
pub struct MockLlm {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl MockLlm {
    /// Create a mock that replays `responses` in order.
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock whose every call fails.
    pub fn failing() -> Self {
        Self::new(vec![])
    }

    /// Number of generate calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn generate(&self, _request: GenerateRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        responses.pop_front().ok_or_else(|| LlmError::RequestFailed {
            provider: "mock".to_string(),
            reason: "script exhausted".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
