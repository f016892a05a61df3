//! News retrieval tool backed by NewsAPI.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::config::{AnalysisConfig, NewsConfig};
use crate::store::ArticleStore;
use crate::tools::tool::{Tool, ToolError};

/// Fetches recent news articles for a ticker and caches them.
pub struct NewsRetrieverTool {
    client: reqwest::Client,
    news: NewsConfig,
    analysis: AnalysisConfig,
    articles: Arc<ArticleStore>,
}

impl NewsRetrieverTool {
    pub fn new(news: NewsConfig, analysis: AnalysisConfig, articles: Arc<ArticleStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            news,
            analysis,
            articles,
        }
    }
}

#[async_trait]
impl Tool for NewsRetrieverTool {
    fn name(&self) -> &str {
        "news_retriever"
    }

    fn description(&self) -> &str {
        "Fetches recent news articles about a company or stock from NewsAPI."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query, e.g. a company name or ticker"
                },
                "ticker": {
                    "type": "string",
                    "description": "Stock ticker the articles relate to"
                },
                "days_back": {
                    "type": "integer",
                    "description": "How many days of history to search"
                },
                "max_articles": {
                    "type": "integer",
                    "description": "Maximum number of articles to return"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        if self.news.api_key.is_empty() {
            return Err(ToolError::NotConfigured(
                "NEWS_API_KEY is not set".to_string(),
            ));
        }

        let query = params
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("missing 'query' parameter".to_string()))?
            .to_string();
        let ticker = params
            .get("ticker")
            .and_then(|v| v.as_str())
            .unwrap_or(&query)
            .to_uppercase();
        let days_back = params
            .get("days_back")
            .and_then(|v| v.as_u64())
            .unwrap_or(self.analysis.days_back as u64) as i64;
        let max_articles = params
            .get("max_articles")
            .and_then(|v| v.as_u64())
            .unwrap_or(self.analysis.max_articles as u64);

        let to_date = Utc::now();
        let from_date = to_date - Duration::days(days_back);

        let url = format!("{}/everything", self.news.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("from", &from_date.format("%Y-%m-%d").to_string()),
                ("to", &to_date.format("%Y-%m-%d").to_string()),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("pageSize", &max_articles.to_string()),
            ])
            .header("X-Api-Key", &self.news.api_key)
            .send()
            .await
            .map_err(|e| ToolError::ExternalService(format!("NewsAPI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::ExternalService(format!(
                "NewsAPI returned HTTP {}: {}",
                status, body
            )));
        }

        let parsed: NewsApiResponse = response
            .json()
            .await
            .map_err(|e| ToolError::ExternalService(format!("NewsAPI parse error: {}", e)))?;

        let mut articles = Vec::new();
        let mut saved = 0usize;
        for article in parsed.articles.into_iter().take(max_articles as usize) {
            let (Some(title), Some(url)) = (article.title.clone(), article.url.clone()) else {
                continue;
            };
            let published_at = article
                .published_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            let source = article.source.name.clone().unwrap_or_default();

            if self
                .articles
                .upsert(
                    &ticker,
                    &title,
                    &url,
                    &source,
                    article.description.clone(),
                    published_at,
                )
                .await
            {
                saved += 1;
            }

            articles.push(serde_json::json!({
                "title": title,
                "url": url,
                "source": source,
                "description": article.description,
                "published_at": article.published_at,
            }));
        }

        tracing::info!(
            ticker,
            fetched = articles.len(),
            saved,
            "Retrieved news articles"
        );

        Ok(serde_json::json!({
            "query": query,
            "ticker": ticker,
            "total_results": parsed.total_results,
            "articles": articles,
            "articles_saved": saved,
            "from_date": from_date.format("%Y-%m-%d").to_string(),
            "to_date": to_date.format("%Y-%m-%d").to_string(),
        }))
    }
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(rename = "totalResults", default)]
    total_results: u64,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(default)]
    source: NewsApiSource,
}

#[derive(Debug, Default, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}
