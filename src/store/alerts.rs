//! Alert store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::report::AnalysisReport;

/// How an alert came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Raised by a monitor firing that detected significant news.
    Proactive,
    /// Raised on behalf of an explicit user request.
    UserRequested,
}

/// A recorded escalation, wrapping the report that triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub ticker: String,
    pub report: AnalysisReport,
    pub triggered_at: DateTime<Utc>,
}

/// In-memory alert store.
#[derive(Default)]
pub struct AlertStore {
    alerts: RwLock<HashMap<Uuid, Alert>>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new alert.
    pub async fn create(
        &self,
        ticker: &str,
        report: AnalysisReport,
        alert_type: AlertType,
    ) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4(),
            alert_type,
            ticker: ticker.to_uppercase(),
            report,
            triggered_at: Utc::now(),
        };
        self.alerts.write().await.insert(alert.id, alert.clone());
        alert
    }

    /// Get an alert by id.
    pub async fn get(&self, id: Uuid) -> Option<Alert> {
        self.alerts.read().await.get(&id).cloned()
    }

    /// Alerts for one ticker, newest first.
    pub async fn list_by_ticker(&self, ticker: &str) -> Vec<Alert> {
        let key = ticker.to_uppercase();
        let mut alerts: Vec<Alert> = self
            .alerts
            .read()
            .await
            .values()
            .filter(|a| a.ticker == key)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        alerts
    }

    /// Every alert, newest first.
    pub async fn list_all(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.alerts.read().await.values().cloned().collect();
        alerts.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        alerts
    }
}
