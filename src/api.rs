//! HTTP surface: analysis jobs, monitors, and alerts.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::agent::Agent;
use crate::error::StoreError;
use crate::extract;
use crate::llm::LlmProvider;
use crate::monitor::MonitorScheduler;
use crate::store::{Alert, AlertStore, Job, JobStore, MonitorState, MonitorStore};

/// Shared state for every handler.
pub struct AppState {
    pub jobs: Arc<JobStore>,
    pub monitors: Arc<MonitorStore>,
    pub alerts: Arc<AlertStore>,
    pub scheduler: Arc<MonitorScheduler>,
    pub agent: Arc<Agent>,
    pub llm: Arc<dyn LlmProvider>,
}

/// Build the application router with all routes under `prefix`.
pub fn router(state: Arc<AppState>, prefix: &str) -> Router {
    let api = Router::new()
        .route("/analyze", post(submit_analysis))
        .route("/status/{job_id}", get(job_status))
        .route("/monitor_start", post(monitor_start))
        .route("/monitor_stop", post(monitor_stop))
        .route("/monitors", get(list_monitors))
        .route("/alerts", get(list_alerts))
        .route("/alerts/{alert_id}", get(get_alert))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .nest(prefix, api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    query: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    job_id: Uuid,
    status: String,
}

async fn submit_analysis(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> axum::response::Response {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "query must not be empty");
    }

    let job_id = Uuid::new_v4();
    let job = state.jobs.create(job_id, &query).await;
    tracing::info!(%job_id, query, "Analysis job submitted");

    tokio::spawn(run_analysis_job(Arc::clone(&state), job_id, query));

    (
        StatusCode::ACCEPTED,
        Json(AnalyzeResponse {
            job_id,
            status: job.status.to_string(),
        }),
    )
        .into_response()
}

/// Background body of one analysis job. Every failure ends up on the Job
/// record; nothing is surfaced to the submitting request.
async fn run_analysis_job(state: Arc<AppState>, job_id: Uuid, query: String) {
    use crate::store::JobStatus;

    if let Err(e) = state.jobs.update_status(job_id, JobStatus::Running).await {
        tracing::error!(%job_id, "Failed to mark job running: {}", e);
        return;
    }

    let extraction = extract::extract_ticker(state.llm.as_ref(), &query).await;
    let Some(ticker) = extraction.ticker else {
        let message = crate::error::AgentError::NoTicker.to_string();
        tracing::warn!(%job_id, "{}", message);
        if let Err(e) = state.jobs.set_error(job_id, &message).await {
            tracing::error!(%job_id, "Failed to record job error: {}", e);
        }
        return;
    };

    let outcome = state
        .agent
        .run(&query, &ticker, extraction.company_name.as_deref())
        .await;

    let result = match outcome {
        Ok(report) => state.jobs.set_report(job_id, report).await,
        Err(e) => state.jobs.set_error(job_id, &e.to_string()).await,
    };
    if let Err(e) = result {
        tracing::error!(%job_id, "Failed to finalize job: {}", e);
    }
}

async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> axum::response::Response {
    match state.jobs.get(job_id).await {
        Some(job) => Json(JobView::from(job)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            StoreError::JobNotFound(job_id).to_string(),
        ),
    }
}

/// Job as rendered to clients.
#[derive(Debug, Serialize)]
struct JobView {
    job_id: Uuid,
    status: String,
    query: String,
    created_at: chrono::DateTime<chrono::Utc>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<crate::report::AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status.to_string(),
            query: job.query,
            created_at: job.created_at,
            completed_at: job.completed_at,
            report: job.report,
            error: job.error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MonitorStartRequest {
    ticker: String,
    /// Override of the default monitoring interval.
    interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MonitorStopRequest {
    ticker: String,
}

/// Monitor state as rendered to clients; the fingerprint set itself stays
/// internal, only its size is reported.
#[derive(Debug, Serialize)]
struct MonitorView {
    ticker: String,
    is_active: bool,
    interval_secs: u64,
    last_run: Option<chrono::DateTime<chrono::Utc>>,
    next_run: Option<chrono::DateTime<chrono::Utc>>,
    seen_articles: usize,
}

impl From<MonitorState> for MonitorView {
    fn from(state: MonitorState) -> Self {
        Self {
            ticker: state.ticker,
            is_active: state.is_active,
            interval_secs: state.interval.as_secs(),
            last_run: state.last_run,
            next_run: state.next_run,
            seen_articles: state.seen_fingerprints.len(),
        }
    }
}

async fn monitor_start(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MonitorStartRequest>,
) -> axum::response::Response {
    let ticker = request.ticker.trim();
    if ticker.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "ticker must not be empty");
    }
    let interval = request.interval_secs.map(Duration::from_secs);

    match state.scheduler.start(ticker, interval).await {
        Ok(monitor) => (StatusCode::CREATED, Json(MonitorView::from(monitor))).into_response(),
        Err(e @ StoreError::MonitorAlreadyActive(_)) => {
            error_response(StatusCode::CONFLICT, e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn monitor_stop(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MonitorStopRequest>,
) -> axum::response::Response {
    match state.scheduler.stop(request.ticker.trim()).await {
        Ok(monitor) => Json(MonitorView::from(monitor)).into_response(),
        Err(e @ StoreError::MonitorNotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e @ StoreError::MonitorAlreadyStopped(_)) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn list_monitors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let monitors: Vec<MonitorView> = state
        .monitors
        .list_all()
        .await
        .into_iter()
        .map(MonitorView::from)
        .collect();
    Json(monitors)
}

#[derive(Debug, Deserialize)]
struct AlertFilter {
    ticker: Option<String>,
}

async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AlertFilter>,
) -> impl IntoResponse {
    let alerts: Vec<Alert> = match filter.ticker {
        Some(ticker) => state.alerts.list_by_ticker(&ticker).await,
        None => state.alerts.list_all().await,
    };
    Json(alerts)
}

async fn get_alert(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<Uuid>,
) -> axum::response::Response {
    match state.alerts.get(alert_id).await {
        Some(alert) => Json(alert).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            StoreError::AlertNotFound(alert_id).to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::llm::mock::MockLlm;
    use crate::tools::ToolRegistry;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state(llm: MockLlm) -> Arc<AppState> {
        let settings = Settings::default();
        let llm: Arc<dyn LlmProvider> = Arc::new(llm);
        let registry = Arc::new(ToolRegistry::new());
        let monitors = Arc::new(MonitorStore::new());
        let alerts = Arc::new(AlertStore::new());
        let agent = Arc::new(Agent::new(
            Arc::clone(&llm),
            Arc::clone(&registry),
            &settings,
        ));
        let scheduler = Arc::new(MonitorScheduler::new(
            Arc::clone(&monitors),
            Arc::clone(&alerts),
            registry,
            Arc::clone(&agent),
            settings.monitor.clone(),
        ));
        Arc::new(AppState {
            jobs: Arc::new(JobStore::new()),
            monitors,
            alerts,
            scheduler,
            agent,
            llm,
        })
    }

    fn app(state: Arc<AppState>) -> Router {
        router(state, "/api/v1")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(test_state(MockLlm::failing()))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let response = app(test_state(MockLlm::failing()))
            .oneshot(
                Request::get(format!("/api/v1/status/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_analyze_without_ticker_fails_job() {
        let state = test_state(MockLlm::new(vec![
            "TICKER: UNKNOWN\nCOMPANY: \nCONFIDENCE: low",
        ]));
        let response = app(Arc::clone(&state))
            .oneshot(
                Request::post("/api/v1/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query": "what should I eat"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        let job_id: Uuid = body["job_id"].as_str().unwrap().parse().unwrap();

        // Wait for the background task to settle the job.
        let mut job = state.jobs.get(job_id).await.unwrap();
        for _ in 0..50 {
            if job.error.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            job = state.jobs.get(job_id).await.unwrap();
        }
        assert_eq!(
            job.error.as_deref(),
            Some("Could not identify a stock ticker in the query")
        );
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let response = app(test_state(MockLlm::failing()))
            .oneshot(
                Request::post("/api/v1/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query": "  "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_monitor_start_conflict_is_409() {
        let state = test_state(MockLlm::failing());
        let start = |app: Router| async move {
            app.oneshot(
                Request::post("/api/v1/monitor_start")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"ticker": "TSLA"}"#))
                    .unwrap(),
            )
            .await
            .unwrap()
        };

        let first = start(app(Arc::clone(&state))).await;
        assert_eq!(first.status(), StatusCode::CREATED);
        let second = start(app(Arc::clone(&state))).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_monitor_stop_unknown_is_404() {
        let response = app(test_state(MockLlm::failing()))
            .oneshot(
                Request::post("/api/v1/monitor_stop")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"ticker": "NVDA"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_alert_listing_and_lookup() {
        let state = test_state(MockLlm::failing());
        let report = crate::report::AnalysisReport {
            ticker: "TSLA".to_string(),
            analysis_summary: "s".to_string(),
            sentiment_score: 0.0,
            key_findings: vec!["f".to_string()],
            tools_used: vec![],
            citation_sources: vec![],
            generated_at: chrono::Utc::now(),
        };
        let alert = state
            .alerts
            .create("TSLA", report, crate::store::AlertType::Proactive)
            .await;

        let response = app(Arc::clone(&state))
            .oneshot(
                Request::get("/api/v1/alerts?ticker=TSLA")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let response = app(state)
            .oneshot(
                Request::get(format!("/api/v1/alerts/{}", alert.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["ticker"], "TSLA");
    }
}
