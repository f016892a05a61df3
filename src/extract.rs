//! Hybrid ticker extraction: regex fast path, LLM fallback.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::llm::{GenerateRequest, LlmProvider};

/// Result of ticker extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerExtraction {
    pub ticker: Option<String>,
    pub company_name: Option<String>,
    /// "high", "medium", or "low".
    pub confidence: String,
    /// "regex" or "llm" — which strategy produced the result.
    pub method: String,
}

/// Patterns that directly name a ticker: `(TSLA)`, `$TSLA`, `TSLA stock`.
fn ticker_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"\(([A-Z]{1,5})\)").expect("valid regex"),
            Regex::new(r"\$([A-Z]{1,5})\b").expect("valid regex"),
            Regex::new(r"\b([A-Z]{2,5})\b\s+(?:stock|shares|price)").expect("valid regex"),
        ]
    })
}

/// Well-known company names to tickers, checked case-insensitively.
const COMPANY_TICKER_MAP: &[(&str, &str)] = &[
    ("tesla", "TSLA"),
    ("apple", "AAPL"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("microsoft", "MSFT"),
    ("amazon", "AMZN"),
    ("meta", "META"),
    ("facebook", "META"),
    ("nvidia", "NVDA"),
    ("netflix", "NFLX"),
    ("amd", "AMD"),
    ("intel", "INTC"),
    ("ibm", "IBM"),
    ("oracle", "ORCL"),
    ("salesforce", "CRM"),
    ("adobe", "ADBE"),
    ("paypal", "PYPL"),
    ("shopify", "SHOP"),
    ("spotify", "SPOT"),
    ("uber", "UBER"),
    ("airbnb", "ABNB"),
    ("coinbase", "COIN"),
    ("palantir", "PLTR"),
    ("snowflake", "SNOW"),
    ("disney", "DIS"),
    ("boeing", "BA"),
    ("walmart", "WMT"),
    ("costco", "COST"),
    ("starbucks", "SBUX"),
    ("mcdonald", "MCD"),
    ("coca-cola", "KO"),
    ("coca cola", "KO"),
    ("pepsi", "PEP"),
    ("pfizer", "PFE"),
    ("moderna", "MRNA"),
    ("berkshire", "BRK.B"),
    ("jpmorgan", "JPM"),
    ("jp morgan", "JPM"),
    ("goldman sachs", "GS"),
    ("morgan stanley", "MS"),
    ("bank of america", "BAC"),
    ("wells fargo", "WFC"),
    ("visa", "V"),
    ("mastercard", "MA"),
    ("american express", "AXP"),
];

/// Try to extract a ticker using regex patterns and the company-name map.
pub fn extract_ticker_regex(query: &str) -> Option<TickerExtraction> {
    for pattern in ticker_patterns() {
        if let Some(captures) = pattern.captures(query) {
            let ticker = captures.get(1)?.as_str().to_uppercase();
            return Some(TickerExtraction {
                ticker: Some(ticker),
                company_name: None,
                confidence: "high".to_string(),
                method: "regex".to_string(),
            });
        }
    }

    let query_lower = query.to_lowercase();
    for (company, ticker) in COMPANY_TICKER_MAP {
        if query_lower.contains(company) {
            return Some(TickerExtraction {
                ticker: Some((*ticker).to_string()),
                company_name: Some(title_case(company)),
                confidence: "high".to_string(),
                method: "regex".to_string(),
            });
        }
    }

    None
}

/// Extract a ticker with the LLM. Never errors: a failed call yields an
/// empty low-confidence result so callers can report "no ticker found".
pub async fn extract_ticker_llm(llm: &dyn LlmProvider, query: &str) -> TickerExtraction {
    let prompt = format!(
        "Extract the stock ticker symbol from the following query.\n\
         \n\
         Query: \"{query}\"\n\
         \n\
         Instructions:\n\
         1. Identify the company or stock being mentioned\n\
         2. Return ONLY the stock ticker symbol (e.g., TSLA, AAPL, GOOGL)\n\
         3. If multiple companies are mentioned, return the PRIMARY one being analyzed\n\
         4. If no specific company/stock can be identified, return \"UNKNOWN\"\n\
         \n\
         Response format (respond with ONLY this, no other text):\n\
         TICKER: <ticker_symbol>\n\
         COMPANY: <company_name>\n\
         CONFIDENCE: <high/medium/low>"
    );

    let response = match llm
        .generate(GenerateRequest::new(prompt).with_temperature(0.1))
        .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("LLM ticker extraction failed: {}", e);
            return TickerExtraction {
                ticker: None,
                company_name: None,
                confidence: "low".to_string(),
                method: "llm".to_string(),
            };
        }
    };

    let mut ticker = None;
    let mut company_name = None;
    let mut confidence = "medium".to_string();

    for line in response.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("TICKER:") {
            let value = rest.trim().to_uppercase();
            if value != "UNKNOWN" && !value.is_empty() {
                ticker = Some(value);
            }
        } else if let Some(rest) = line.strip_prefix("COMPANY:") {
            let value = rest.trim();
            if !value.is_empty() {
                company_name = Some(value.to_string());
            }
        } else if let Some(rest) = line.strip_prefix("CONFIDENCE:") {
            let value = rest.trim().to_lowercase();
            if matches!(value.as_str(), "high" | "medium" | "low") {
                confidence = value;
            }
        }
    }

    TickerExtraction {
        ticker,
        company_name,
        confidence,
        method: "llm".to_string(),
    }
}

/// Extract a ticker using the hybrid approach: regex first, LLM fallback.
pub async fn extract_ticker(llm: &dyn LlmProvider, query: &str) -> TickerExtraction {
    if let Some(result) = extract_ticker_regex(query) {
        if result.ticker.is_some() {
            return result;
        }
    }
    extract_ticker_llm(llm, query).await
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
