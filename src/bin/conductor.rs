//! Conductor HTTP server.
//!
//! Reads configuration from the environment (see [`ConductorConfig`]),
//! assembles the job service over `PostgreSQL` when `DATABASE_URL` is set
//! and over the in-memory store otherwise, restarts the loops of jobs left
//! `running`, then serves the JSON API until Ctrl+C.

use conductor::agent::adapters::HttpExecutionAgent;
use conductor::api::{JobApi, router};
use conductor::config::ConductorConfig;
use conductor::job::{
    adapters::{memory::InMemoryJobStore, postgres::PostgresJobStore},
    ports::JobStore,
};
use conductor::orchestration::services::{JobService, Orchestrator};
use conductor::planner::{adapters::OpenAiPlanGenerator, services::PlannerService};
use conductor::source_control::adapters::{DisabledSourceControl, GitHubSourceControl};
use conductor::telemetry;
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Builder;
use tracing::{info, warn};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    if !telemetry::init_tracing() {
        warn!("tracing subscriber already installed");
    }
    let config = ConductorConfig::from_env()?;
    let runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: ConductorConfig) -> Result<(), BoxError> {
    let api = match config.database_url.as_deref() {
        Some(url) => {
            let pool = Pool::builder().build(ConnectionManager::<PgConnection>::new(url))?;
            info!("using PostgreSQL job store");
            assemble(Arc::new(PostgresJobStore::new(pool)), &config)
        }
        None => {
            warn!("DATABASE_URL not set; jobs are kept in memory only");
            assemble(Arc::new(InMemoryJobStore::new()), &config)
        }
    };

    let recovered = api.recover_running().await?;
    if !recovered.is_empty() {
        info!(jobs = recovered.len(), "resumed running jobs");
    }

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "conductor listening");
    axum::serve(listener, router(api))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("conductor stopped");
    Ok(())
}

fn assemble<S>(store: Arc<S>, config: &ConductorConfig) -> Arc<dyn JobApi>
where
    S: JobStore + 'static,
{
    let clock = Arc::new(DefaultClock);
    let generator = OpenAiPlanGenerator::new(config.planner.api_key.clone())
        .with_model(config.planner.model.clone())
        .with_endpoint(config.planner.endpoint.clone());
    let agent = HttpExecutionAgent::new(config.agent.api_key.clone())
        .with_base_url(config.agent.base_url.clone());
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&store),
        Arc::new(agent),
        Arc::clone(&clock),
        config.policy,
    ));
    let planner = PlannerService::new(Arc::new(generator));

    if let Some(token) = &config.github_token {
        let source_control = Arc::new(GitHubSourceControl::new(token.clone()));
        Arc::new(JobService::new(store, planner, source_control, orchestrator, clock))
    } else {
        warn!("GITHUB_TOKEN not set; branches and pull requests are skipped");
        let source_control = Arc::new(DisabledSourceControl);
        Arc::new(JobService::new(store, planner, source_control, orchestrator, clock))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
