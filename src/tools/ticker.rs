//! Ticker extraction as a registry tool.

use std::sync::Arc;

use async_trait::async_trait;

use crate::extract;
use crate::llm::LlmProvider;
use crate::tools::tool::{Tool, ToolError};

/// Identifies the stock ticker a free-text query is about.
pub struct TickerExtractorTool {
    llm: Arc<dyn LlmProvider>,
}

impl TickerExtractorTool {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for TickerExtractorTool {
    fn name(&self) -> &str {
        "ticker_extractor"
    }

    fn description(&self) -> &str {
        "Identifies the stock ticker symbol a query refers to."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "User query mentioning a company or stock"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let query = params
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("missing 'query' parameter".to_string()))?;

        let result = extract::extract_ticker(self.llm.as_ref(), query).await;
        Ok(serde_json::json!({
            "ticker": result.ticker,
            "company_name": result.company_name,
            "confidence": result.confidence,
            "method": result.method,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockLlm;

    #[tokio::test]
    async fn test_regex_path_reports_method() {
        let tool = TickerExtractorTool::new(Arc::new(MockLlm::failing()));
        let result = tool
            .execute(serde_json::json!({"query": "Analyze $AAPL"}))
            .await
            .unwrap();
        assert_eq!(result["ticker"], "AAPL");
        assert_eq!(result["method"], "regex");
    }

    #[tokio::test]
    async fn test_missing_query_invalid() {
        let tool = TickerExtractorTool::new(Arc::new(MockLlm::failing()));
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }
}
