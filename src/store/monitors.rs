//! Monitor state store.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StoreError;

/// Persisted state for one monitored ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorState {
    pub ticker: String,
    pub interval: Duration,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Fingerprints of every article ever seen for this ticker.
    /// Append-only; entries are never removed.
    pub seen_fingerprints: HashSet<String>,
}

/// In-memory monitor store, keyed by upper-cased ticker.
#[derive(Default)]
pub struct MonitorStore {
    monitors: RwLock<HashMap<String, MonitorState>>,
}

impl MonitorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a monitor, or reactivate and update an existing one. The seen
    /// set of an existing monitor is preserved.
    pub async fn create_or_update(
        &self,
        ticker: &str,
        interval: Duration,
        next_run: DateTime<Utc>,
    ) -> MonitorState {
        let key = ticker.to_uppercase();
        let mut monitors = self.monitors.write().await;
        let state = monitors
            .entry(key.clone())
            .and_modify(|m| {
                m.interval = interval;
                m.next_run = Some(next_run);
                m.is_active = true;
            })
            .or_insert_with(|| MonitorState {
                ticker: key,
                interval,
                last_run: None,
                next_run: Some(next_run),
                is_active: true,
                seen_fingerprints: HashSet::new(),
            });
        state.clone()
    }

    /// Get monitor state by ticker.
    pub async fn get(&self, ticker: &str) -> Option<MonitorState> {
        self.monitors.read().await.get(&ticker.to_uppercase()).cloned()
    }

    /// Record a firing: set last run and the already-computed next run.
    pub async fn update_run_times(
        &self,
        ticker: &str,
        last_run: DateTime<Utc>,
        next_run: DateTime<Utc>,
    ) -> Result<MonitorState, StoreError> {
        let key = ticker.to_uppercase();
        let mut monitors = self.monitors.write().await;
        let state = monitors
            .get_mut(&key)
            .ok_or_else(|| StoreError::MonitorNotFound(key.clone()))?;
        state.last_run = Some(last_run);
        state.next_run = Some(next_run);
        Ok(state.clone())
    }

    /// Merge fingerprints into the seen set. Append-only.
    pub async fn add_seen_fingerprints(
        &self,
        ticker: &str,
        fingerprints: impl IntoIterator<Item = String>,
    ) -> Result<(), StoreError> {
        let key = ticker.to_uppercase();
        let mut monitors = self.monitors.write().await;
        let state = monitors
            .get_mut(&key)
            .ok_or_else(|| StoreError::MonitorNotFound(key.clone()))?;
        state.seen_fingerprints.extend(fingerprints);
        Ok(())
    }

    /// Deactivate a monitor and clear its next-run time.
    pub async fn stop(&self, ticker: &str) -> Result<MonitorState, StoreError> {
        let key = ticker.to_uppercase();
        let mut monitors = self.monitors.write().await;
        let state = monitors
            .get_mut(&key)
            .ok_or_else(|| StoreError::MonitorNotFound(key.clone()))?;
        if !state.is_active {
            return Err(StoreError::MonitorAlreadyStopped(key));
        }
        state.is_active = false;
        state.next_run = None;
        Ok(state.clone())
    }

    /// All currently active monitors.
    pub async fn list_active(&self) -> Vec<MonitorState> {
        self.monitors
            .read()
            .await
            .values()
            .filter(|m| m.is_active)
            .cloned()
            .collect()
    }

    /// Every monitor, active or not.
    pub async fn list_all(&self) -> Vec<MonitorState> {
        self.monitors.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_reactivate_preserves_seen_set() {
        let store = MonitorStore::new();
        let interval = Duration::from_secs(3600);
        store.create_or_update("tsla", interval, Utc::now()).await;
        store
            .add_seen_fingerprints("TSLA", vec!["abc".to_string()])
            .await
            .unwrap();
        store.stop("TSLA").await.unwrap();

        let state = store.create_or_update("TSLA", interval, Utc::now()).await;
        assert!(state.is_active);
        assert!(state.seen_fingerprints.contains("abc"));
    }

    #[tokio::test]
    async fn test_seen_set_is_append_only() {
        let store = MonitorStore::new();
        store
            .create_or_update("NVDA", Duration::from_secs(60), Utc::now())
            .await;
        store
            .add_seen_fingerprints("NVDA", vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        store
            .add_seen_fingerprints("NVDA", vec!["b".to_string(), "c".to_string()])
            .await
            .unwrap();

        let state = store.get("NVDA").await.unwrap();
        assert_eq!(state.seen_fingerprints.len(), 3);
    }

    #[tokio::test]
    async fn test_stop_inactive_rejected() {
        let store = MonitorStore::new();
        store
            .create_or_update("AAPL", Duration::from_secs(60), Utc::now())
            .await;
        store.stop("AAPL").await.unwrap();

        let err = store.stop("AAPL").await.unwrap_err();
        assert!(matches!(err, StoreError::MonitorAlreadyStopped(_)));
    }

    #[tokio::test]
    async fn test_stop_missing_rejected() {
        let store = MonitorStore::new();
        let err = store.stop("MSFT").await.unwrap_err();
        assert!(matches!(err, StoreError::MonitorNotFound(_)));
    }

    #[tokio::test]
    async fn test_stop_clears_next_run() {
        let store = MonitorStore::new();
        store
            .create_or_update("AMZN", Duration::from_secs(60), Utc::now())
            .await;
        let state = store.stop("AMZN").await.unwrap();
        assert!(state.next_run.is_none());
        assert!(!state.is_active);
    }

    #[tokio::test]
    async fn test_list_active_filters() {
        let store = MonitorStore::new();
        store
            .create_or_update("A", Duration::from_secs(60), Utc::now())
            .await;
        store
            .create_or_update("B", Duration::from_secs(60), Utc::now())
            .await;
        store.stop("A").await.unwrap();

        let active = store.list_active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].ticker, "B");
        assert_eq!(store.list_all().await.len(), 2);
    }
}
