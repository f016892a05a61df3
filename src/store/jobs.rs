//! Analysis job store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::report::AnalysisReport;

/// Lifecycle state of an analysis job. Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A submitted analysis job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub query: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub report: Option<AnalysisReport>,
    pub error: Option<String>,
}

/// In-memory job store.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new pending job.
    pub async fn create(&self, id: Uuid, query: &str) -> Job {
        let job = Job {
            id,
            status: JobStatus::Pending,
            query: query.to_string(),
            created_at: Utc::now(),
            completed_at: None,
            report: None,
            error: None,
        };
        self.jobs.write().await.insert(id, job.clone());
        job
    }

    /// Get a job by id.
    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Update a job's status; terminal statuses stamp `completed_at`.
    pub async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::JobNotFound(id))?;
        job.status = status;
        if matches!(status, JobStatus::Completed | JobStatus::Failed) {
            job.completed_at = Some(Utc::now());
        }
        Ok(job.clone())
    }

    /// Attach a report and mark the job completed.
    pub async fn set_report(&self, id: Uuid, report: AnalysisReport) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::JobNotFound(id))?;
        job.report = Some(report);
        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());
        Ok(job.clone())
    }

    /// Record an error and mark the job failed.
    pub async fn set_error(&self, id: Uuid, error: &str) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::JobNotFound(id))?;
        job.error = Some(error.to_string());
        job.status = JobStatus::Failed;
        job.completed_at = Some(Utc::now());
        Ok(job.clone())
    }

    /// All jobs, newest first.
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }
}
