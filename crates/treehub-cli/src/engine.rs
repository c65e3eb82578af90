//! Wiring from configuration to engine components.

use std::sync::Arc;

use treehub_core::config::AppConfig;
use treehub_core::error::AppError;
use treehub_database::{
    DatabasePool, MemoryRunLog, PgNodeStore, PgReferenceSource, PgRunLog, RunLogStore,
};
use treehub_worker::notify::{self, NoopNotifier, Notifier};
use treehub_worker::{EngineContext, JobExecutor, RunOrchestrator};

/// Connect to the database and check which configured tables exist.
pub async fn connect(config: &AppConfig) -> Result<DatabasePool, AppError> {
    let pool = DatabasePool::connect(&config.database, &config.collections).await?;
    pool.health_check(&config.collections).await?;
    Ok(pool)
}

/// Node stores and reference source over the configured tables.
pub fn context(config: &AppConfig, pool: &DatabasePool) -> Result<EngineContext, AppError> {
    let nodes = PgNodeStore::new(pool.pool().clone(), &config.collections.nodes)?;
    let staging = PgNodeStore::new(pool.pool().clone(), &config.collections.staging)?;
    let references = PgReferenceSource::new(pool.pool().clone(), &config.collections)?;
    Ok(EngineContext::new(
        Arc::new(nodes),
        Arc::new(staging),
        Arc::new(references),
        config.engine.clone(),
    ))
}

/// An orchestrator with the run-log table and webhook, or with in-memory
/// sinks when `record` is false.
pub fn orchestrator(
    config: &AppConfig,
    pool: &DatabasePool,
    ctx: EngineContext,
    record: bool,
) -> Result<RunOrchestrator, AppError> {
    let (run_log, notifier): (Arc<dyn RunLogStore>, Arc<dyn Notifier>) = if record {
        (
            Arc::new(PgRunLog::new(pool.pool().clone(), &config.collections.run_log)?),
            notify::from_config(&config.notifications)?,
        )
    } else {
        (Arc::new(MemoryRunLog::new()), Arc::new(NoopNotifier))
    };

    Ok(RunOrchestrator::new(
        Arc::new(JobExecutor::with_defaults()),
        ctx,
        run_log,
        notifier,
        &config.notifications.app_version,
    ))
}
