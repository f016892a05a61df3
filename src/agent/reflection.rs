//! Reflection gate: post-hoc quality assessment of a finished analysis.
//!
//! The gate can only trigger retries; it never blocks a result. Any failure
//! while assessing yields a default accepting verdict.

use std::sync::Arc;

use crate::agent::parse::extract_json;
use crate::agent::prompts::reflection_prompt;
use crate::llm::{GenerateRequest, LlmProvider};

/// Quality verdict for one analysis.
#[derive(Debug, Clone)]
pub struct ReflectionVerdict {
    pub quality_score: f64,
    pub is_acceptable: bool,
    pub improvements: Vec<String>,
    pub refined_summary: Option<String>,
}

impl ReflectionVerdict {
    /// The fail-open verdict used when assessment itself fails.
    fn fail_open() -> Self {
        Self {
            quality_score: 0.5,
            is_acceptable: true,
            improvements: vec!["Reflection assessment could not be completed".to_string()],
            refined_summary: None,
        }
    }
}

/// LLM-backed quality gate.
pub struct ReflectionGate {
    llm: Arc<dyn LlmProvider>,
    /// Scores at or above this are acceptable when the model omits an
    /// explicit acceptance flag.
    min_quality_score: f64,
}

impl ReflectionGate {
    pub fn new(llm: Arc<dyn LlmProvider>, min_quality_score: f64) -> Self {
        Self {
            llm,
            min_quality_score,
        }
    }

    /// Assess one analysis. Never errors.
    pub async fn assess(
        &self,
        ticker: &str,
        analysis_summary: &str,
        sentiment_score: f64,
        key_findings: &[String],
        tools_used: &[String],
        sources_count: usize,
    ) -> ReflectionVerdict {
        tracing::info!(ticker, "Reflecting on analysis quality");

        let findings = key_findings
            .iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n");
        let tools = if tools_used.is_empty() {
            "None".to_string()
        } else {
            tools_used.join(", ")
        };

        let prompt = reflection_prompt(
            ticker,
            analysis_summary,
            sentiment_score,
            &findings,
            &tools,
            sources_count,
        );

        let response = match self
            .llm
            .generate(GenerateRequest::new(prompt).with_temperature(0.2))
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Reflection call failed: {}", e);
                return ReflectionVerdict::fail_open();
            }
        };

        let Some(parsed) = extract_json(&response) else {
            tracing::warn!("Reflection response contained no parseable JSON");
            return ReflectionVerdict::fail_open();
        };

        let quality_score = parsed
            .get("quality_score")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.5);
        let is_acceptable = parsed
            .get("is_acceptable")
            .and_then(|v| v.as_bool())
            .unwrap_or(quality_score >= self.min_quality_score);
        let improvements = parsed
            .get("improvements")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let refined_summary = parsed
            .get("refined_summary")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from);

        ReflectionVerdict {
            quality_score,
            is_acceptable,
            improvements,
            refined_summary,
        }
    }
}
