//! The bounded ReAct reasoning loop.
//!
//! Each iteration renders a prompt from the system instructions, the tool
//! registry description, and the step history, asks the model for a JSON
//! action, and dispatches it. The loop ends with an explicit `final_answer`
//! action, with budget exhaustion, or with a model-call failure.

use std::sync::Arc;

use crate::agent::parse::extract_json;
use crate::agent::prompts::{react_prompt, SYSTEM_PROMPT};
use crate::llm::{GenerateRequest, LlmProvider};
use crate::report::FinalAnswer;
use crate::tools::ToolRegistry;

/// Observations longer than this are truncated in the prompt history.
const OBSERVATION_LIMIT: usize = 2000;

/// One recorded iteration of the loop.
#[derive(Debug, Clone)]
pub struct ReasoningStep {
    pub step_number: u32,
    pub thought: String,
    pub action: String,
    pub action_input: serde_json::Value,
    pub observation: Option<String>,
    pub error: Option<String>,
}

/// Terminal state of a loop run.
#[derive(Debug, Clone)]
pub enum LoopOutcome {
    /// The model produced an explicit final answer.
    Success(FinalAnswer),
    /// The step budget ran out without a final answer.
    Exhausted { error: String },
    /// A model call itself failed.
    Failed { error: String },
}

/// Everything a loop run produced.
#[derive(Debug, Clone)]
pub struct LoopResult {
    pub outcome: LoopOutcome,
    pub steps: Vec<ReasoningStep>,
    /// Distinct tool names in first-use order.
    pub tools_used: Vec<String>,
    /// Every news URL seen, in encounter order, not deduplicated.
    pub sources: Vec<String>,
}

impl LoopResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, LoopOutcome::Success(_))
    }
}

/// The reasoning loop itself. Stateless across runs; all per-run state lives
/// on the stack of [`ReactLoop::run`].
pub struct ReactLoop {
    llm: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    /// Model used for reasoning steps, usually stronger than the default.
    react_model: String,
}

impl ReactLoop {
    pub fn new(llm: Arc<dyn LlmProvider>, registry: Arc<ToolRegistry>, react_model: String) -> Self {
        Self {
            llm,
            registry,
            react_model,
        }
    }

    /// Run the loop for one analysis, with at most `max_steps` iterations.
    pub async fn run(
        &self,
        ticker: &str,
        query: &str,
        company_name: Option<&str>,
        max_steps: u32,
    ) -> LoopResult {
        let company = company_name.unwrap_or(ticker);
        let mut steps: Vec<ReasoningStep> = Vec::new();
        let mut tools_used: Vec<String> = Vec::new();
        let mut sources: Vec<String> = Vec::new();

        tracing::info!(ticker, company, "Starting reasoning loop");

        for step_num in 1..=max_steps {
            tracing::info!("Reasoning step {}/{}", step_num, max_steps);

            let prompt = format!(
                "{}\n\n{}",
                SYSTEM_PROMPT,
                react_prompt(
                    ticker,
                    company,
                    query,
                    &self.registry.describe(),
                    &format_history(&steps),
                )
            );

            let response = match self
                .llm
                .generate(
                    GenerateRequest::new(prompt)
                        .with_model(self.react_model.clone())
                        .with_temperature(0.3),
                )
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!("LLM call failed: {}", e);
                    return LoopResult {
                        outcome: LoopOutcome::Failed {
                            error: format!("LLM call failed: {}", e),
                        },
                        steps,
                        tools_used: dedup_first_use(tools_used),
                        sources,
                    };
                }
            };

            // A response with no parseable JSON skips this iteration but
            // still spends a budget slot.
            let Some(parsed) = extract_json(&response) else {
                tracing::warn!(
                    "Failed to parse JSON from model response: {:.200}",
                    response
                );
                continue;
            };

            let thought = parsed
                .get("thought")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let action = parsed
                .get("action")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let action_input = parsed
                .get("action_input")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({}));

            let mut step = ReasoningStep {
                step_number: step_num,
                thought,
                action: action.clone(),
                action_input: action_input.clone(),
                observation: None,
                error: None,
            };

            if action == "final_answer" {
                tracing::info!("Reasoning loop completed with final_answer");
                steps.push(step);
                return LoopResult {
                    outcome: LoopOutcome::Success(FinalAnswer::from_value(&action_input)),
                    steps,
                    tools_used: dedup_first_use(tools_used),
                    sources,
                };
            }

            let outcome = self.registry.dispatch(&action, action_input).await;
            if outcome.success {
                step.observation = Some(format_observation(&outcome.data));

                // ticker_extractor records which strategy resolved the
                // ticker, e.g. "ticker_extractor:regex".
                if action == "ticker_extractor" {
                    let method = outcome
                        .data
                        .get("method")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown");
                    tools_used.push(format!("{}:{}", action, method));
                } else {
                    tools_used.push(action.clone());
                }

                if action == "news_retriever" {
                    if let Some(articles) = outcome.data.get("articles").and_then(|v| v.as_array())
                    {
                        for article in articles {
                            if let Some(url) = article.get("url").and_then(|v| v.as_str()) {
                                sources.push(url.to_string());
                            }
                        }
                    }
                }
            } else {
                let reason = outcome.error.unwrap_or_else(|| "unknown error".to_string());
                step.observation = Some(format!("Tool error: {}", reason));
                step.error = Some(reason);
            }

            steps.push(step);
        }

        tracing::warn!(
            "Reasoning loop reached max steps ({}) without final answer",
            max_steps
        );
        LoopResult {
            outcome: LoopOutcome::Exhausted {
                error: format!("Analysis incomplete after {} steps", max_steps),
            },
            steps,
            tools_used: dedup_first_use(tools_used),
            sources,
        }
    }
}

/// Render the step history for the prompt, truncating long observations.
fn format_history(steps: &[ReasoningStep]) -> String {
    if steps.is_empty() {
        return "No previous steps yet.".to_string();
    }

    let mut sections = Vec::with_capacity(steps.len());
    for step in steps {
        let input = serde_json::to_string_pretty(&step.action_input)
            .unwrap_or_else(|_| step.action_input.to_string());
        let mut parts = vec![
            format!("Step {}:", step.step_number),
            format!("  Thought: {}", step.thought),
            format!("  Action: {}", step.action),
            format!("  Action Input: {}", input),
        ];
        if let Some(observation) = &step.observation {
            parts.push(format!("  Observation: {}", truncate(observation)));
        }
        if let Some(error) = &step.error {
            parts.push(format!("  Error: {}", error));
        }
        sections.push(parts.join("\n"));
    }
    sections.join("\n\n")
}

fn truncate(observation: &str) -> String {
    if observation.chars().count() <= OBSERVATION_LIMIT {
        return observation.to_string();
    }
    let head: String = observation.chars().take(OBSERVATION_LIMIT).collect();
    format!("{}... [truncated]", head)
}

fn format_observation(data: &serde_json::Value) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
}

/// Distinct entries in first-occurrence order.
fn dedup_first_use(names: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockLlm;
    use crate::tools::{Tool, ToolError};
    use async_trait::async_trait;

    struct FixedTool {
        name: &'static str,
        data: serde_json::Value,
    }

    #[async_trait]
    impl Tool for FixedTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Fixed test tool."
        }

        async fn execute(
            &self,
            _params: serde_json::Value,
        ) -> Result<serde_json::Value, ToolError> {
            Ok(self.data.clone())
        }
    }

    fn test_registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(FixedTool {
            name: "market_data",
            data: serde_json::json!({"ticker": "TSLA", "current_price": 250.5}),
        });
        registry.register(FixedTool {
            name: "news_retriever",
            data: serde_json::json!({
                "articles": [
                    {"title": "a", "url": "https://news/1"},
                    {"title": "b", "url": "https://news/2"}
                ]
            }),
        });
        registry.register(FixedTool {
            name: "sentiment_analyzer",
            data: serde_json::json!({"overall_score": 0.4}),
        });
        Arc::new(registry)
    }

    fn action(name: &str) -> String {
        format!(
            r#"{{"thought": "next", "action": "{}", "action_input": {{}}}}"#,
            name
        )
    }

    const FINAL: &str = r#"{
        "thought": "done",
        "action": "final_answer",
        "action_input": {
            "analysis_summary": "Looks healthy.",
            "sentiment_score": 0.4,
            "key_findings": ["f1", "f2", "f3"]
        }
    }"#;

    #[tokio::test]
    async fn test_four_step_analysis_scenario() {
        let llm = Arc::new(MockLlm::new(vec![
            &action("market_data"),
            &action("news_retriever"),
            &action("sentiment_analyzer"),
            FINAL,
        ]));
        let react = ReactLoop::new(llm, test_registry(), "test-model".to_string());

        let result = react.run("TSLA", "Analyze TSLA", Some("Tesla"), 10).await;
        assert!(result.is_success());
        assert_eq!(result.steps.len(), 4);
        assert_eq!(
            result.tools_used,
            vec!["market_data", "news_retriever", "sentiment_analyzer"]
        );
        assert_eq!(result.sources, vec!["https://news/1", "https://news/2"]);

        let LoopOutcome::Success(answer) = result.outcome else {
            panic!("expected success");
        };
        assert_eq!(answer.analysis_summary, "Looks healthy.");
        assert_eq!(answer.key_findings.len(), 3);
    }

    #[tokio::test]
    async fn test_unparseable_responses_exhaust_budget() {
        let llm = Arc::new(MockLlm::new(vec!["not json"; 5]));
        let react = ReactLoop::new(Arc::clone(&llm) as _, test_registry(), "m".to_string());

        let result = react.run("TSLA", "q", None, 5).await;
        assert!(matches!(result.outcome, LoopOutcome::Exhausted { .. }));
        assert!(result.steps.is_empty());
        // Exactly one model call per budget slot, never more.
        assert_eq!(llm.call_count(), 5);
        let LoopOutcome::Exhausted { error } = result.outcome else {
            unreachable!()
        };
        assert_eq!(error, "Analysis incomplete after 5 steps");
    }

    #[tokio::test]
    async fn test_llm_failure_terminates_as_failed() {
        let llm = Arc::new(MockLlm::failing());
        let react = ReactLoop::new(llm, test_registry(), "m".to_string());

        let result = react.run("TSLA", "q", None, 10).await;
        let LoopOutcome::Failed { error } = result.outcome else {
            panic!("expected failure");
        };
        assert!(error.starts_with("LLM call failed:"));
    }

    #[tokio::test]
    async fn test_unknown_action_is_nonfatal() {
        let llm = Arc::new(MockLlm::new(vec![&action("no_such_tool"), FINAL]));
        let react = ReactLoop::new(llm, test_registry(), "m".to_string());

        let result = react.run("TSLA", "q", None, 10).await;
        assert!(result.is_success());
        assert_eq!(result.steps.len(), 2);
        let error = result.steps[0].error.as_ref().unwrap();
        assert!(error.contains("no_such_tool"));
        assert!(error.contains("market_data"));
        assert!(result.tools_used.is_empty());
    }

    #[tokio::test]
    async fn test_repeat_tool_use_deduplicated_at_return() {
        let llm = Arc::new(MockLlm::new(vec![
            &action("news_retriever"),
            &action("news_retriever"),
            FINAL,
        ]));
        let react = ReactLoop::new(llm, test_registry(), "m".to_string());

        let result = react.run("TSLA", "q", None, 10).await;
        assert_eq!(result.tools_used, vec!["news_retriever"]);
        // Sources are never deduplicated.
        assert_eq!(result.sources.len(), 4);
    }

    #[test]
    fn test_history_truncates_long_observations() {
        let steps = vec![ReasoningStep {
            step_number: 1,
            thought: "t".to_string(),
            action: "a".to_string(),
            action_input: serde_json::json!({}),
            observation: Some("x".repeat(3000)),
            error: None,
        }];
        let history = format_history(&steps);
        assert!(history.contains("... [truncated]"));
        assert!(!history.contains(&"x".repeat(2001)));
    }

    #[test]
    fn test_empty_history_placeholder() {
        assert_eq!(format_history(&[]), "No previous steps yet.");
    }
}
