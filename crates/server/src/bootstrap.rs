use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use tabula_agent::{AgentRuntime, HttpLlmClient, LlmError};
use tabula_core::config::{AppConfig, ConfigError, LoadOptions};
use tabula_core::guardrails::GuardrailService;
use tabula_db::{connect_from_config, migrations, DbPool, SqliteCostRecorder, SqliteQueryExecutor};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<GuardrailService>,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client construction failed: {0}")]
    Llm(#[source] LlmError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    let report = migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        applied = report.applied.len(),
        total = report.total,
        "database migrations applied"
    );

    let llm = Arc::new(HttpLlmClient::from_config(&config.llm).map_err(BootstrapError::Llm)?);
    let executor = Arc::new(SqliteQueryExecutor::new(
        db_pool.clone(),
        config.guardrails.max_result_rows,
        config.guardrails.query_timeout_secs,
    ));
    let cost_sink = Arc::new(SqliteCostRecorder::new(db_pool.clone()));
    let service = Arc::new(GuardrailService::new());

    let runtime = Arc::new(AgentRuntime::new(
        &config.guardrails,
        Arc::clone(&service),
        llm,
        executor,
        cost_sink,
    ));
    info!(
        event_name = "system.bootstrap.runtime_ready",
        correlation_id = "bootstrap",
        llm_model = %config.llm.model,
        "agent runtime constructed"
    );

    Ok(Application { config, db_pool, service, runtime })
}
