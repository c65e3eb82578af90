//! Job execution commands.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use treehub_core::config::AppConfig;
use treehub_core::error::AppError;
use treehub_entity::run::RunStatus;
use treehub_worker::runner::format_duration;
use treehub_worker::{JobKind, RunSummary};

use crate::engine;
use crate::output::{self, OutputFormat};

/// Arguments for the run command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Jobs to run, in the order given
    #[arg(
        value_parser = parse_job,
        required_unless_present = "all",
        conflicts_with = "all"
    )]
    pub jobs: Vec<JobKind>,

    /// Run every job in pipeline order
    #[arg(long)]
    pub all: bool,

    /// Deepest level to process instead of the store's maximum
    #[arg(long)]
    pub max_depth: Option<i32>,

    /// Keep run records in memory and skip notifications
    #[arg(long)]
    pub no_record: bool,
}

impl RunArgs {
    /// Jobs to run, in order.
    pub fn selected(&self) -> Vec<JobKind> {
        if self.all {
            JobKind::ALL.to_vec()
        } else {
            self.jobs.clone()
        }
    }
}

fn parse_job(s: &str) -> Result<JobKind, String> {
    s.parse::<JobKind>().map_err(|e| e.message)
}

/// One row of the run summary table
#[derive(Debug, Serialize, Tabled)]
struct RunRow {
    #[tabled(rename = "Job")]
    job: String,
    #[tabled(rename = "Status")]
    status: RunStatus,
    #[tabled(rename = "Modified")]
    modified: u64,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Details")]
    details: String,
}

impl From<&RunSummary> for RunRow {
    fn from(summary: &RunSummary) -> Self {
        let (modified, details) = match &summary.report {
            Some(report) => {
                let mut parts: Vec<String> = report
                    .totals
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect();
                let failed = report
                    .passes
                    .iter()
                    .flat_map(|p| p.levels.iter())
                    .filter(|l| l.error.is_some())
                    .count();
                if failed > 0 {
                    parts.push(format!("failed_levels={failed}"));
                }
                if let Some(e) = &report.error {
                    parts.push(e.clone());
                }
                (report.modified(), parts.join(", "))
            }
            None => (0, "not dispatched".to_string()),
        };
        Self {
            job: summary.label.clone(),
            status: summary.status,
            modified,
            duration: format_duration(summary.duration),
            details,
        }
    }
}

/// Execute the run command. Returns whether every job succeeded.
pub async fn execute(
    args: &RunArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<bool, AppError> {
    let pool = engine::connect(config).await?;
    let ctx = engine::context(config, &pool)?;
    let orchestrator = engine::orchestrator(config, &pool, ctx, !args.no_record)?;

    let summaries = orchestrator.run_all(&args.selected(), args.max_depth).await;
    pool.close().await;

    match format {
        OutputFormat::Table => {
            let rows: Vec<RunRow> = summaries.iter().map(RunRow::from).collect();
            output::print_list(&rows, format);
        }
        OutputFormat::Json => output::print_json(&summaries),
    }

    let ok = summaries.iter().all(|s| s.status == RunStatus::Success);
    if !ok {
        output::print_warning("One or more jobs finished with errors");
    }
    Ok(ok)
}
