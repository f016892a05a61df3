//! The structured analysis report and final-answer sanitization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder finding used when the model returned none.
pub const EMPTY_FINDINGS_PLACEHOLDER: &str =
    "Analysis completed but no specific findings extracted";

/// The structured investment analysis report.
///
/// Invariants: `sentiment_score` in [-1.0, 1.0], `key_findings` holds one to
/// five entries. Both are enforced by [`FinalAnswer::from_value`], the only
/// path that produces report fields from model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Stock ticker symbol.
    pub ticker: String,
    /// Concise paragraph synthesizing all findings.
    pub analysis_summary: String,
    /// Sentiment between -1.0 (very negative) and 1.0 (very positive).
    pub sentiment_score: f64,
    /// One to five actionable insights.
    pub key_findings: Vec<String>,
    /// Capabilities exercised during the run (distinct, first-use order).
    pub tools_used: Vec<String>,
    /// Source URLs, in encounter order, not deduplicated.
    pub citation_sources: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Sanitized fields of a `final_answer` action.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalAnswer {
    pub analysis_summary: String,
    pub sentiment_score: f64,
    pub key_findings: Vec<String>,
}

impl FinalAnswer {
    /// Build a sanitized answer from the raw `action_input` of a
    /// `final_answer` step.
    ///
    /// The sentiment score is clamped to [-1, 1], findings are coerced to
    /// strings and capped at five, and an empty findings list is replaced
    /// with a single placeholder entry.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let analysis_summary = value
            .get("analysis_summary")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let sentiment_score = value
            .get("sentiment_score")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0);

        let mut key_findings: Vec<String> = match value.get("key_findings") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .take(5)
                .map(|item| match item {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(serde_json::Value::Null) | None => Vec::new(),
            Some(serde_json::Value::String(s)) => vec![s.clone()],
            Some(other) => vec![other.to_string()],
        };
        if key_findings.is_empty() {
            key_findings.push(EMPTY_FINDINGS_PLACEHOLDER.to_string());
        }

        Self {
            analysis_summary,
            sentiment_score,
            key_findings,
        }
    }
}
