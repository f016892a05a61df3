//! Server entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use finsight::agent::Agent;
use finsight::api::{self, AppState};
use finsight::config::Settings;
use finsight::llm::create_llm_provider;
use finsight::monitor::MonitorScheduler;
use finsight::store::{AlertStore, ArticleStore, JobStore, MonitorStore};
use finsight::tools;

#[derive(Debug, Parser)]
#[command(name = "finsight", about = "Autonomous investment research agent")]
struct Cli {
    /// Listen address, overriding HTTP_BIND_ADDR.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env();
    if let Some(bind) = cli.bind {
        settings.http.bind_addr = bind;
    }

    let llm = create_llm_provider(&settings.llm).context("failed to create LLM provider")?;

    let jobs = Arc::new(JobStore::new());
    let monitors = Arc::new(MonitorStore::new());
    let alerts = Arc::new(AlertStore::new());
    let articles = Arc::new(ArticleStore::new());

    let registry = Arc::new(tools::build_registry(&settings, Arc::clone(&llm), articles));
    let agent = Arc::new(Agent::new(
        Arc::clone(&llm),
        Arc::clone(&registry),
        &settings,
    ));
    let scheduler = Arc::new(MonitorScheduler::new(
        Arc::clone(&monitors),
        Arc::clone(&alerts),
        Arc::clone(&registry),
        Arc::clone(&agent),
        settings.monitor.clone(),
    ));

    // Pick monitoring back up for every subject that was active before the
    // last shutdown. Intervals restart from now.
    scheduler.restore_active().await;

    let state = Arc::new(AppState {
        jobs,
        monitors,
        alerts,
        scheduler,
        agent,
        llm,
    });
    let app = api::router(state, &settings.http.api_prefix);

    let listener = tokio::net::TcpListener::bind(&settings.http.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.http.bind_addr))?;
    tracing::info!("Listening on {}", settings.http.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
