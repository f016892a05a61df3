//! Cached news articles.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

/// One article as fetched from the news provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedArticle {
    /// Hex sha256 of the article URL; stable across refetches.
    pub id: String,
    pub ticker: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

/// Derive the cache key for an article URL.
pub fn article_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// In-memory article cache, keyed by URL hash.
#[derive(Default)]
pub struct ArticleStore {
    articles: RwLock<HashMap<String, CachedArticle>>,
}

impl ArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh an article. Refetching the same URL updates
    /// `fetched_at` without creating a duplicate. Returns true when the
    /// article was not cached before.
    pub async fn upsert(
        &self,
        ticker: &str,
        title: &str,
        url: &str,
        source: &str,
        description: Option<String>,
        published_at: Option<DateTime<Utc>>,
    ) -> bool {
        let id = article_id(url);
        let mut articles = self.articles.write().await;
        let is_new = !articles.contains_key(&id);
        articles.insert(
            id.clone(),
            CachedArticle {
                id,
                ticker: ticker.to_uppercase(),
                title: title.to_string(),
                url: url.to_string(),
                source: source.to_string(),
                description,
                published_at,
                fetched_at: Utc::now(),
            },
        );
        is_new
    }

    /// Get an article by URL hash.
    pub async fn get(&self, id: &str) -> Option<CachedArticle> {
        self.articles.read().await.get(id).cloned()
    }

    /// Cached articles for a ticker, most recently published first.
    pub async fn list_by_ticker(&self, ticker: &str) -> Vec<CachedArticle> {
        let key = ticker.to_uppercase();
        let mut articles: Vec<CachedArticle> = self
            .articles
            .read()
            .await
            .values()
            .filter(|a| a.ticker == key)
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        articles
    }

    pub async fn len(&self) -> usize {
        self.articles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.articles.read().await.is_empty()
    }
}
