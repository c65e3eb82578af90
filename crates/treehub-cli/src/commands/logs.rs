//! Run log listing.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use treehub_core::config::AppConfig;
use treehub_core::error::AppError;
use treehub_database::PgRunLog;
use treehub_entity::run::{RunLogEntry, RunStatus};

use crate::engine;
use crate::output::{self, OutputFormat};

/// Arguments for the logs command
#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Number of entries to show
    #[arg(short, long, default_value_t = 20)]
    pub limit: i64,
}

#[derive(Debug, Serialize, Tabled)]
struct LogRow {
    #[tabled(rename = "Job")]
    job: String,
    #[tabled(rename = "Description")]
    text: String,
    #[tabled(rename = "Started")]
    start_time: String,
    #[tabled(rename = "Finished")]
    end_time: String,
    #[tabled(rename = "Status")]
    status: RunStatus,
}

impl From<RunLogEntry> for LogRow {
    fn from(entry: RunLogEntry) -> Self {
        let fmt = "%Y-%m-%d %H:%M:%S";
        Self {
            job: entry.run_type,
            text: entry.text,
            start_time: entry.start_time.format(fmt).to_string(),
            end_time: output::or_dash(entry.end_time.map(|t| t.format(fmt))),
            status: entry.status,
        }
    }
}

/// List the most recent run records.
pub async fn execute(args: &LogsArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let pool = engine::connect(config).await?;
    let run_log = PgRunLog::new(pool.pool().clone(), &config.collections.run_log)?;
    let entries = run_log.recent(args.limit).await?;
    pool.close().await;

    match format {
        OutputFormat::Table => {
            let rows: Vec<LogRow> = entries.into_iter().map(LogRow::from).collect();
            output::print_list(&rows, format);
        }
        OutputFormat::Json => output::print_json(&entries),
    }
    Ok(())
}
