//! Market data tool backed by the Yahoo Finance chart endpoint.

use async_trait::async_trait;
use serde::Deserialize;

use crate::tools::tool::{Tool, ToolError};

const CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Fetches a current quote and recent daily closes for a ticker.
pub struct MarketDataTool {
    client: reqwest::Client,
}

impl MarketDataTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for MarketDataTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for MarketDataTool {
    fn name(&self) -> &str {
        "market_data"
    }

    fn description(&self) -> &str {
        "Fetches the current stock price, previous close, and recent daily closes for a ticker."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "ticker": {
                    "type": "string",
                    "description": "Stock ticker symbol, e.g. TSLA"
                },
                "range": {
                    "type": "string",
                    "description": "History range such as 5d, 1mo, or 3mo (default 1mo)"
                }
            },
            "required": ["ticker"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let ticker = params
            .get("ticker")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("missing 'ticker' parameter".to_string()))?
            .to_uppercase();
        let range = params
            .get("range")
            .and_then(|v| v.as_str())
            .unwrap_or("1mo");

        let url = format!("{}/{}", CHART_BASE, ticker);
        let response = self
            .client
            .get(&url)
            .query(&[("range", range), ("interval", "1d")])
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await
            .map_err(|e| ToolError::ExternalService(format!("chart request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExternalService(format!(
                "chart endpoint returned HTTP {} for {}",
                status, ticker
            )));
        }

        let parsed: ChartResponse = response
            .json()
            .await
            .map_err(|e| ToolError::ExternalService(format!("chart parse error: {}", e)))?;

        let result = parsed
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| {
                ToolError::ExecutionFailed(format!("no market data available for {}", ticker))
            })?;

        let meta = result.meta;
        let closes: Vec<f64> = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close.into_iter().flatten().collect())
            .unwrap_or_default();

        let change_percent = match (meta.regular_market_price, meta.chart_previous_close) {
            (Some(price), Some(prev)) if prev != 0.0 => Some((price - prev) / prev * 100.0),
            _ => None,
        };

        Ok(serde_json::json!({
            "ticker": ticker,
            "currency": meta.currency,
            "current_price": meta.regular_market_price,
            "previous_close": meta.chart_previous_close,
            "change_percent": change_percent,
            "range": range,
            "daily_closes": closes,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    currency: Option<String>,
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "chartPreviousClose")]
    chart_previous_close: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}
