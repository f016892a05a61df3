//! One monitor firing: fetch, fingerprint, dedup, escalate.

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::agent::Agent;
use crate::config::MonitorConfig;
use crate::store::{AlertStore, AlertType, MonitorStore};
use crate::tools::ToolRegistry;

/// Monitoring tracks deltas, so it looks at a much narrower window than an
/// on-demand analysis.
const MONITOR_DAYS_BACK: u32 = 1;
const MONITOR_MAX_ARTICLES: u32 = 10;

/// Stable content fingerprint for one article.
pub(crate) fn fingerprint(title: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", title, canonical_url(url)).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Canonical form of an article URL: fragment stripped, trailing slash
/// trimmed, so tracking variants of the same page collapse together.
fn canonical_url(url: &str) -> &str {
    let without_fragment = url.split('#').next().unwrap_or(url);
    without_fragment.trim_end_matches('/')
}

/// Run one firing for `ticker`.
///
/// Advances the run times before any work so a slow or failed run never
/// compounds scheduling delay. Failures are logged and swallowed; the
/// scheduler never retries a firing.
pub(crate) async fn run_monitor_cycle(
    ticker: &str,
    monitors: &MonitorStore,
    alerts: &AlertStore,
    registry: &ToolRegistry,
    agent: &Agent,
    config: &MonitorConfig,
) {
    let Some(state) = monitors.get(ticker).await else {
        tracing::warn!(ticker, "Monitor fired for unknown ticker, skipping");
        return;
    };
    if !state.is_active {
        tracing::debug!(ticker, "Monitor fired but is inactive, skipping");
        return;
    }

    let now = Utc::now();
    let interval = chrono::Duration::from_std(state.interval)
        .unwrap_or_else(|_| chrono::Duration::days(1));
    if let Err(e) = monitors
        .update_run_times(ticker, now, now + interval)
        .await
    {
        tracing::error!(ticker, "Failed to update monitor run times: {}", e);
        return;
    }

    let outcome = registry
        .dispatch(
            "news_retriever",
            serde_json::json!({
                "query": ticker,
                "ticker": ticker,
                "days_back": MONITOR_DAYS_BACK,
                "max_articles": MONITOR_MAX_ARTICLES,
            }),
        )
        .await;
    if !outcome.success {
        tracing::warn!(
            ticker,
            "Monitor news fetch failed: {}",
            outcome.error.unwrap_or_default()
        );
        return;
    }

    let articles = outcome
        .data
        .get("articles")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut all_fingerprints = Vec::with_capacity(articles.len());
    let mut new_count = 0usize;
    for article in &articles {
        let title = article.get("title").and_then(|v| v.as_str()).unwrap_or("");
        let url = article.get("url").and_then(|v| v.as_str()).unwrap_or("");
        let fp = fingerprint(title, url);
        if !state.seen_fingerprints.contains(&fp) {
            new_count += 1;
        }
        all_fingerprints.push(fp);
    }

    // Every fetched fingerprint is merged, seen or not, so re-fetched items
    // keep their seen status even if the set was populated elsewhere.
    if let Err(e) = monitors.add_seen_fingerprints(ticker, all_fingerprints).await {
        tracing::error!(ticker, "Failed to persist fingerprints: {}", e);
        return;
    }

    tracing::info!(
        ticker,
        fetched = articles.len(),
        new = new_count,
        "Monitor cycle fetched articles"
    );

    if new_count < config.min_articles {
        tracing::debug!(
            ticker,
            new = new_count,
            threshold = config.min_articles,
            "Below alert threshold, no escalation"
        );
        return;
    }

    match agent.run_quick(ticker, None).await {
        Ok(report) => {
            let alert = alerts.create(ticker, report, AlertType::Proactive).await;
            tracing::info!(ticker, alert_id = %alert.id, "Proactive alert created");
        }
        Err(e) => {
            tracing::warn!(ticker, "Quick analysis for alert failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::llm::mock::MockLlm;
    use crate::tools::{Tool, ToolError};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_fingerprint_ignores_fragment_and_trailing_slash() {
        let base = fingerprint("Title", "https://example.com/story");
        assert_eq!(base, fingerprint("Title", "https://example.com/story/"));
        assert_eq!(base, fingerprint("Title", "https://example.com/story#section"));
        assert_ne!(base, fingerprint("Title", "https://example.com/other"));
        assert_ne!(base, fingerprint("Other", "https://example.com/story"));
    }

    struct FakeNews {
        articles: Vec<serde_json::Value>,
    }

    #[async_trait]
    impl Tool for FakeNews {
        fn name(&self) -> &str {
            "news_retriever"
        }

        fn description(&self) -> &str {
            "Fake news source."
        }

        async fn execute(
            &self,
            _params: serde_json::Value,
        ) -> Result<serde_json::Value, ToolError> {
            Ok(serde_json::json!({"articles": self.articles}))
        }
    }

    fn article(n: usize) -> serde_json::Value {
        serde_json::json!({"title": format!("t{}", n), "url": format!("https://news/{}", n)})
    }

    struct Fixture {
        monitors: Arc<MonitorStore>,
        alerts: Arc<AlertStore>,
        registry: Arc<ToolRegistry>,
        agent: Agent,
        config: MonitorConfig,
    }

    fn fixture(articles: Vec<serde_json::Value>, llm_script: Vec<&str>) -> Fixture {
        let mut registry = ToolRegistry::new();
        registry.register(FakeNews { articles });
        let registry = Arc::new(registry);
        let settings = Settings::default();
        let llm = Arc::new(MockLlm::new(llm_script));
        Fixture {
            monitors: Arc::new(MonitorStore::new()),
            alerts: Arc::new(AlertStore::new()),
            registry: Arc::clone(&registry),
            agent: Agent::new(llm, registry, &settings),
            config: settings.monitor.clone(),
        }
    }

    const FINAL: &str = r#"{
        "thought": "done",
        "action": "final_answer",
        "action_input": {
            "analysis_summary": "Brief update.",
            "sentiment_score": 0.1,
            "key_findings": ["f1"]
        }
    }"#;

    #[tokio::test]
    async fn test_below_threshold_merges_all_but_no_alert() {
        // 4 fetched, 3 new (one pre-seen), threshold 5.
        let f = fixture((0..4).map(article).collect(), vec![]);
        f.monitors
            .create_or_update("TSLA", Duration::from_secs(60), Utc::now())
            .await;
        f.monitors
            .add_seen_fingerprints("TSLA", vec![fingerprint("t0", "https://news/0")])
            .await
            .unwrap();

        run_monitor_cycle("TSLA", &f.monitors, &f.alerts, &f.registry, &f.agent, &f.config)
            .await;

        assert!(f.alerts.list_all().await.is_empty());
        let state = f.monitors.get("TSLA").await.unwrap();
        // All 4 fetched fingerprints merged, not just the 3 new ones.
        assert_eq!(state.seen_fingerprints.len(), 4);
        assert!(state.last_run.is_some());
        assert!(state.next_run.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn test_at_threshold_creates_one_alert() {
        let f = fixture((0..5).map(article).collect(), vec![FINAL]);
        f.monitors
            .create_or_update("TSLA", Duration::from_secs(60), Utc::now())
            .await;

        run_monitor_cycle("TSLA", &f.monitors, &f.alerts, &f.registry, &f.agent, &f.config)
            .await;

        let alerts = f.alerts.list_by_ticker("TSLA").await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Proactive);
        assert_eq!(alerts[0].report.analysis_summary, "Brief update.");
    }

    #[tokio::test]
    async fn test_quick_analysis_failure_is_swallowed() {
        // Enough new articles to escalate, but the model never answers.
        let f = fixture((0..5).map(article).collect(), vec![]);
        f.monitors
            .create_or_update("TSLA", Duration::from_secs(60), Utc::now())
            .await;

        run_monitor_cycle("TSLA", &f.monitors, &f.alerts, &f.registry, &f.agent, &f.config)
            .await;

        assert!(f.alerts.list_all().await.is_empty());
        // Run times still advanced and fingerprints still merged.
        let state = f.monitors.get("TSLA").await.unwrap();
        assert_eq!(state.seen_fingerprints.len(), 5);
        assert!(state.last_run.is_some());
    }

    #[tokio::test]
    async fn test_inactive_monitor_does_nothing() {
        let f = fixture((0..5).map(article).collect(), vec![FINAL]);
        f.monitors
            .create_or_update("TSLA", Duration::from_secs(60), Utc::now())
            .await;
        f.monitors.stop("TSLA").await.unwrap();

        run_monitor_cycle("TSLA", &f.monitors, &f.alerts, &f.registry, &f.agent, &f.config)
            .await;

        let state = f.monitors.get("TSLA").await.unwrap();
        assert!(state.last_run.is_none());
        assert!(state.seen_fingerprints.is_empty());
        assert!(f.alerts.list_all().await.is_empty());
    }
}
