//! LLM-backed sentiment analysis over news articles.

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{GenerateRequest, LlmProvider};
use crate::tools::tool::{Tool, ToolError};

/// Scores article sentiment with one LLM call per article, then aggregates.
pub struct SentimentAnalyzerTool {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl SentimentAnalyzerTool {
    pub fn new(llm: Arc<dyn LlmProvider>, model: String) -> Self {
        Self { llm, model }
    }

    async fn score_article(&self, ticker: &str, text: &str) -> Result<ArticleScore, ToolError> {
        let prompt = format!(
            "Analyze the sentiment of this news article about {ticker} from an \
             investor's perspective.\n\
             \n\
             Article: {text}\n\
             \n\
             Respond in EXACTLY this format (no other text):\n\
             SENTIMENT: <positive/negative/neutral>\n\
             SCORE: <number between -1.0 and 1.0>\n\
             REASONING: <one sentence>"
        );

        let response = self
            .llm
            .generate(
                GenerateRequest::new(prompt)
                    .with_model(self.model.clone())
                    .with_temperature(0.1),
            )
            .await
            .map_err(|e| ToolError::ExternalService(format!("sentiment call failed: {}", e)))?;

        Ok(parse_article_score(&response))
    }
}

#[async_trait]
impl Tool for SentimentAnalyzerTool {
    fn name(&self) -> &str {
        "sentiment_analyzer"
    }

    fn description(&self) -> &str {
        "Analyzes investor sentiment of news articles, returning per-article scores and an overall score."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "ticker": {
                    "type": "string",
                    "description": "Stock ticker the articles concern"
                },
                "articles": {
                    "type": "array",
                    "description": "Articles to score; each needs a title and may have a description",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "description": {"type": "string"}
                        }
                    }
                }
            },
            "required": ["ticker", "articles"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let ticker = params
            .get("ticker")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("missing 'ticker' parameter".to_string()))?
            .to_uppercase();
        let articles = params
            .get("articles")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                ToolError::InvalidParameters("missing 'articles' parameter".to_string())
            })?;

        if articles.is_empty() {
            return Ok(serde_json::json!({
                "ticker": ticker,
                "overall_sentiment": "neutral",
                "overall_score": 0.0,
                "articles_analyzed": 0,
                "article_sentiments": [],
            }));
        }

        let mut scores = Vec::with_capacity(articles.len());
        let mut details = Vec::with_capacity(articles.len());
        for article in articles {
            let title = article.get("title").and_then(|v| v.as_str()).unwrap_or("");
            let description = article
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let text = if description.is_empty() {
                title.to_string()
            } else {
                format!("{}. {}", title, description)
            };

            let score = self.score_article(&ticker, &text).await?;
            scores.push(score.score);
            details.push(serde_json::json!({
                "title": title,
                "sentiment": score.sentiment,
                "score": score.score,
                "reasoning": score.reasoning,
            }));
        }

        let overall = scores.iter().sum::<f64>() / scores.len() as f64;
        let label = overall_label(overall, &scores);

        tracing::debug!(ticker, overall, label, "Aggregated article sentiment");

        Ok(serde_json::json!({
            "ticker": ticker,
            "overall_sentiment": label,
            "overall_score": overall,
            "articles_analyzed": scores.len(),
            "article_sentiments": details,
        }))
    }
}

struct ArticleScore {
    sentiment: String,
    score: f64,
    reasoning: String,
}

/// Parse the SENTIMENT/SCORE/REASONING line format, tolerating missing
/// lines by defaulting to neutral.
fn parse_article_score(response: &str) -> ArticleScore {
    let mut sentiment = "neutral".to_string();
    let mut score = 0.0;
    let mut reasoning = String::new();

    for line in response.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("SENTIMENT:") {
            let value = rest.trim().to_lowercase();
            if matches!(value.as_str(), "positive" | "negative" | "neutral") {
                sentiment = value;
            }
        } else if let Some(rest) = line.strip_prefix("SCORE:") {
            if let Ok(value) = rest.trim().parse::<f64>() {
                score = value.clamp(-1.0, 1.0);
            }
        } else if let Some(rest) = line.strip_prefix("REASONING:") {
            reasoning = rest.trim().to_string();
        }
    }

    ArticleScore {
        sentiment,
        score,
        reasoning,
    }
}

/// Label the average score. A wide spread between extremes reads as mixed.
fn overall_label(overall: f64, scores: &[f64]) -> &'static str {
    if overall >= 0.3 {
        "positive"
    } else if overall <= -0.3 {
        "negative"
    } else {
        let max = scores.iter().cloned().fold(f64::MIN, f64::max);
        let min = scores.iter().cloned().fold(f64::MAX, f64::min);
        if max - min > 0.5 {
            "mixed"
        } else {
            "neutral"
        }
    }
}
