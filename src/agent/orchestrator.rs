//! Analysis orchestrator: loop attempts, reflection gating, report assembly.

use std::sync::Arc;

use chrono::Utc;

use crate::agent::react::{LoopOutcome, ReactLoop};
use crate::agent::reflection::ReflectionGate;
use crate::config::Settings;
use crate::error::AgentError;
use crate::llm::LlmProvider;
use crate::report::AnalysisReport;
use crate::tools::ToolRegistry;

/// Step budget for the quick variant used by monitors.
const QUICK_MAX_STEPS: u32 = 6;

/// The analysis agent. Owns a reasoning loop and a reflection gate and runs
/// the retry protocol around them.
pub struct Agent {
    react: ReactLoop,
    reflection: ReflectionGate,
    max_steps: u32,
    max_retries: u32,
    reflection_enabled: bool,
}

impl Agent {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        settings: &Settings,
    ) -> Self {
        Self {
            react: ReactLoop::new(
                Arc::clone(&llm),
                registry,
                settings.llm.react_model.clone(),
            ),
            reflection: ReflectionGate::new(llm, settings.reflection.min_quality_score),
            max_steps: settings.analysis.max_steps,
            max_retries: settings.analysis.max_retries,
            reflection_enabled: settings.reflection.enabled,
        }
    }

    /// Run a full analysis with reflection and retries as configured.
    pub async fn run(
        &self,
        query: &str,
        ticker: &str,
        company_name: Option<&str>,
    ) -> Result<AnalysisReport, AgentError> {
        self.run_with(
            query,
            ticker,
            company_name,
            self.max_steps,
            self.reflection_enabled,
            self.max_retries,
        )
        .await
    }

    /// Run a quick analysis: fewer steps, no reflection, no retries. Used by
    /// scheduled monitoring where latency matters more than polish.
    pub async fn run_quick(
        &self,
        ticker: &str,
        company_name: Option<&str>,
    ) -> Result<AnalysisReport, AgentError> {
        let query = format!("Provide a brief market update for {}", ticker);
        self.run_with(&query, ticker, company_name, QUICK_MAX_STEPS, false, 0)
            .await
    }

    async fn run_with(
        &self,
        query: &str,
        ticker: &str,
        company_name: Option<&str>,
        max_steps: u32,
        enable_reflection: bool,
        max_retries: u32,
    ) -> Result<AnalysisReport, AgentError> {
        tracing::info!(ticker, query, "Starting analysis agent");

        let mut last_cause = "ReAct loop failed".to_string();

        for attempt in 0..=max_retries {
            if attempt > 0 {
                tracing::info!("Retry attempt {}/{}", attempt, max_retries);
            }

            let result = self.react.run(ticker, query, company_name, max_steps).await;

            let answer = match result.outcome {
                LoopOutcome::Success(answer) => answer,
                LoopOutcome::Exhausted { error } | LoopOutcome::Failed { error } => {
                    tracing::warn!("Reasoning loop failed: {}", error);
                    last_cause = error;
                    continue;
                }
            };

            let mut analysis_summary = answer.analysis_summary;

            if enable_reflection {
                let verdict = self
                    .reflection
                    .assess(
                        ticker,
                        &analysis_summary,
                        answer.sentiment_score,
                        &answer.key_findings,
                        &result.tools_used,
                        result.sources.len(),
                    )
                    .await;

                tracing::info!("Reflection quality score: {}", verdict.quality_score);

                if verdict.is_acceptable {
                    if let Some(refined) = verdict.refined_summary {
                        analysis_summary = refined;
                    }
                } else if attempt < max_retries {
                    last_cause = format!("Quality score too low: {}", verdict.quality_score);
                    tracing::warn!(
                        "{}. Improvements: {:?}",
                        last_cause,
                        verdict.improvements
                    );
                    continue;
                }
                // Rejected with no retries left: the result stands anyway.
            }

            let report = AnalysisReport {
                ticker: ticker.to_string(),
                analysis_summary,
                sentiment_score: answer.sentiment_score,
                key_findings: answer.key_findings,
                tools_used: result.tools_used,
                citation_sources: result.sources,
                generated_at: Utc::now(),
            };

            tracing::info!(ticker, "Agent completed successfully");
            return Ok(report);
        }

        let err = AgentError::Exhausted {
            attempts: max_retries + 1,
            last_cause,
        };
        tracing::error!("{}", err);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockLlm;
    use crate::tools::{Tool, ToolError};
    use async_trait::async_trait;

    struct NoopTool;

    #[async_trait]
    impl Tool for NoopTool {
        fn name(&self) -> &str {
            "market_data"
        }

        fn description(&self) -> &str {
            "Noop."
        }

        async fn execute(
            &self,
            _params: serde_json::Value,
        ) -> Result<serde_json::Value, ToolError> {
            Ok(serde_json::json!({}))
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(NoopTool);
        Arc::new(registry)
    }

    fn settings(max_retries: u32, reflection_enabled: bool) -> Settings {
        let mut settings = Settings::default();
        settings.analysis.max_steps = 5;
        settings.analysis.max_retries = max_retries;
        settings.reflection.enabled = reflection_enabled;
        settings
    }

    const FINAL: &str = r#"{
        "thought": "done",
        "action": "final_answer",
        "action_input": {
            "analysis_summary": "Original summary.",
            "sentiment_score": 0.2,
            "key_findings": ["f1"]
        }
    }"#;

    const REJECT: &str = r#"{"quality_score": 0.2, "is_acceptable": false, "improvements": ["more data"]}"#;
    const ACCEPT_REFINED: &str =
        r#"{"quality_score": 0.9, "is_acceptable": true, "refined_summary": "Refined summary."}"#;

    #[tokio::test]
    async fn test_accepted_reflection_substitutes_refined_summary() {
        let llm = Arc::new(MockLlm::new(vec![FINAL, ACCEPT_REFINED]));
        let agent = Agent::new(llm, registry(), &settings(1, true));

        let report = agent.run("Analyze TSLA", "TSLA", None).await.unwrap();
        assert_eq!(report.analysis_summary, "Refined summary.");
        assert_eq!(report.ticker, "TSLA");
    }

    #[tokio::test]
    async fn test_always_rejecting_gate_runs_exactly_budget_plus_one() {
        // Two loop runs (retry budget 1), each followed by a rejection.
        let llm = Arc::new(MockLlm::new(vec![FINAL, REJECT, FINAL, REJECT]));
        let agent = Agent::new(Arc::clone(&llm) as _, registry(), &settings(1, true));

        let report = agent.run("Analyze TSLA", "TSLA", None).await.unwrap();
        // The last result is returned unrefined despite rejection.
        assert_eq!(report.analysis_summary, "Original summary.");
        assert_eq!(llm.call_count(), 4);
    }

    #[tokio::test]
    async fn test_all_attempts_failing_reports_last_cause() {
        // Garbage on every step of both attempts: the loop exhausts twice.
        let llm = Arc::new(MockLlm::new(vec!["garbage"; 10]));
        let agent = Agent::new(llm, registry(), &settings(1, false));

        let err = agent.run("Analyze TSLA", "TSLA", None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Analysis failed after 2 attempts: Analysis incomplete after 5 steps"
        );
    }

    #[tokio::test]
    async fn test_quick_variant_skips_reflection() {
        // One scripted response only: if reflection ran it would fail open,
        // but the call count proves it never ran.
        let llm = Arc::new(MockLlm::new(vec![FINAL]));
        let agent = Agent::new(Arc::clone(&llm) as _, registry(), &settings(3, true));

        let report = agent.run_quick("NVDA", None).await.unwrap();
        assert_eq!(report.analysis_summary, "Original summary.");
        assert_eq!(llm.call_count(), 1);
    }
}
