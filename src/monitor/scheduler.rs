//! Per-ticker recurring monitor tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::agent::Agent;
use crate::config::MonitorConfig;
use crate::error::StoreError;
use crate::monitor::task::run_monitor_cycle;
use crate::store::{AlertStore, MonitorState, MonitorStore};
use crate::tools::ToolRegistry;

/// Owns one recurring task per monitored ticker.
///
/// Stopping a monitor aborts its task, which only prevents future firings;
/// a firing already past its tick runs to completion on its own task.
pub struct MonitorScheduler {
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
    monitors: Arc<MonitorStore>,
    alerts: Arc<AlertStore>,
    registry: Arc<ToolRegistry>,
    agent: Arc<Agent>,
    config: MonitorConfig,
}

impl MonitorScheduler {
    pub fn new(
        monitors: Arc<MonitorStore>,
        alerts: Arc<AlertStore>,
        registry: Arc<ToolRegistry>,
        agent: Arc<Agent>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            monitors,
            alerts,
            registry,
            agent,
            config,
        }
    }

    /// Start monitoring a ticker. Rejects tickers that already have a
    /// running task.
    pub async fn start(
        &self,
        ticker: &str,
        interval: Option<Duration>,
    ) -> Result<MonitorState, StoreError> {
        let key = ticker.to_uppercase();
        let interval = interval.unwrap_or(self.config.interval);

        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&key) {
            return Err(StoreError::MonitorAlreadyActive(key));
        }

        let next_run = chrono::Utc::now()
            + chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::days(1));
        let state = self
            .monitors
            .create_or_update(&key, interval, next_run)
            .await;

        tasks.insert(key.clone(), self.spawn_task(key.clone(), interval));
        tracing::info!(ticker = key, ?interval, "Monitor started");
        Ok(state)
    }

    /// Stop monitoring a ticker: abort its task and deactivate its state.
    pub async fn stop(&self, ticker: &str) -> Result<MonitorState, StoreError> {
        let key = ticker.to_uppercase();

        if let Some(handle) = self.tasks.lock().await.remove(&key) {
            handle.abort();
        }
        let state = self.monitors.stop(&key).await?;
        tracing::info!(ticker = key, "Monitor stopped");
        Ok(state)
    }

    /// Re-register every active monitor from persisted state. Intervals
    /// restart from now; missed firings are not backfilled.
    pub async fn restore_active(&self) {
        let active = self.monitors.list_active().await;
        let mut tasks = self.tasks.lock().await;
        for state in active {
            if tasks.contains_key(&state.ticker) {
                continue;
            }
            tracing::info!(ticker = state.ticker, "Restoring monitor");
            tasks.insert(
                state.ticker.clone(),
                self.spawn_task(state.ticker.clone(), state.interval),
            );
        }
    }

    /// Tickers with a running task.
    pub async fn running(&self) -> Vec<String> {
        self.tasks.lock().await.keys().cloned().collect()
    }

    fn spawn_task(&self, ticker: String, interval: Duration) -> JoinHandle<()> {
        let monitors = Arc::clone(&self.monitors);
        let alerts = Arc::clone(&self.alerts);
        let registry = Arc::clone(&self.registry);
        let agent = Arc::clone(&self.agent);
        let config = self.config.clone();

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the first real firing
            // happens one full interval from now.
            timer.tick().await;
            loop {
                timer.tick().await;
                run_monitor_cycle(&ticker, &monitors, &alerts, &registry, &agent, &config).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::llm::mock::MockLlm;

    fn scheduler() -> MonitorScheduler {
        let settings = Settings::default();
        let registry = Arc::new(ToolRegistry::new());
        let llm = Arc::new(MockLlm::failing());
        let agent = Arc::new(Agent::new(llm, Arc::clone(&registry), &settings));
        MonitorScheduler::new(
            Arc::new(MonitorStore::new()),
            Arc::new(AlertStore::new()),
            registry,
            agent,
            settings.monitor.clone(),
        )
    }

    #[tokio::test]
    async fn test_start_twice_is_conflict() {
        let scheduler = scheduler();
        scheduler.start("TSLA", None).await.unwrap();
        let err = scheduler.start("tsla", None).await.unwrap_err();
        assert!(matches!(err, StoreError::MonitorAlreadyActive(_)));
    }

    #[tokio::test]
    async fn test_stop_removes_task_and_deactivates() {
        let scheduler = scheduler();
        scheduler.start("TSLA", None).await.unwrap();
        assert_eq!(scheduler.running().await, vec!["TSLA"]);

        let state = scheduler.stop("TSLA").await.unwrap();
        assert!(!state.is_active);
        assert!(scheduler.running().await.is_empty());
    }

    #[tokio::test]
    async fn test_stop_unknown_errors() {
        let scheduler = scheduler();
        let err = scheduler.stop("NVDA").await.unwrap_err();
        assert!(matches!(err, StoreError::MonitorNotFound(_)));
    }

    #[tokio::test]
    async fn test_restart_after_stop_allowed() {
        let scheduler = scheduler();
        scheduler.start("TSLA", None).await.unwrap();
        scheduler.stop("TSLA").await.unwrap();
        let state = scheduler.start("TSLA", None).await.unwrap();
        assert!(state.is_active);
    }

    #[tokio::test]
    async fn test_restore_active_respawns_tasks() {
        let settings = Settings::default();
        let registry = Arc::new(ToolRegistry::new());
        let llm = Arc::new(MockLlm::failing());
        let agent = Arc::new(Agent::new(llm, Arc::clone(&registry), &settings));
        let monitors = Arc::new(MonitorStore::new());
        monitors
            .create_or_update("TSLA", Duration::from_secs(60), chrono::Utc::now())
            .await;
        monitors
            .create_or_update("NVDA", Duration::from_secs(60), chrono::Utc::now())
            .await;
        monitors.stop("NVDA").await.unwrap();

        let scheduler = MonitorScheduler::new(
            monitors,
            Arc::new(AlertStore::new()),
            registry,
            agent,
            settings.monitor.clone(),
        );
        scheduler.restore_active().await;

        assert_eq!(scheduler.running().await, vec!["TSLA"]);
    }
}
