//! Run orchestrator: wraps one job execution with a run-log record, a
//! status notification and an elapsed-time line.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use treehub_database::RunLogStore;
use treehub_entity::run::{CreateRunLogEntry, RunStatus};

use crate::context::EngineContext;
use crate::executor::{JobExecutor, JobKind, JobReport};
use crate::notify::Notifier;

/// Outcome of one orchestrated run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Which job ran.
    pub kind: JobKind,
    /// Label such as `"4/8 EMPTINESS"`.
    pub label: String,
    /// Job description.
    pub text: String,
    /// When the run started.
    pub start_time: DateTime<Utc>,
    /// When the run finished.
    pub end_time: DateTime<Utc>,
    /// Wall-clock duration.
    pub duration: Duration,
    /// Terminal status.
    pub status: RunStatus,
    /// Job report; absent when the job could not be dispatched.
    pub report: Option<JobReport>,
}

impl RunSummary {
    /// The notification line, e.g. `"4/8 EMPTINESS | Find empty folders | success"`.
    pub fn message(&self) -> String {
        format!("{} | {} | {}", self.label, self.text, self.status)
    }
}

/// Format a duration as `"Xh Ym Zs"`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Runs jobs against one context, recording each in the run log and
/// announcing its status.
#[derive(Debug, Clone)]
pub struct RunOrchestrator {
    executor: Arc<JobExecutor>,
    ctx: EngineContext,
    run_log: Arc<dyn RunLogStore>,
    notifier: Arc<dyn Notifier>,
    app_version: String,
}

impl RunOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        executor: Arc<JobExecutor>,
        ctx: EngineContext,
        run_log: Arc<dyn RunLogStore>,
        notifier: Arc<dyn Notifier>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            ctx,
            run_log,
            notifier,
            app_version: app_version.into(),
        }
    }

    /// Run one job. Sink failures are logged and never change the status.
    pub async fn run(&self, kind: JobKind, max_depth: Option<i32>) -> RunSummary {
        let label = kind.label();
        tracing::info!("{} v.{}", label, self.app_version);

        let start_time = Utc::now();
        let started = Instant::now();

        let entry = match self
            .run_log
            .open(&CreateRunLogEntry {
                run_type: label.clone(),
                text: kind.text().to_string(),
                start_time,
            })
            .await
        {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Failed to open run log entry for {}: {}", label, e);
                None
            }
        };

        let report = match self.executor.execute(kind, &self.ctx, max_depth).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!("Job {} could not be dispatched: {}", kind, e);
                None
            }
        };
        let status = match &report {
            Some(report) if report.is_success() => RunStatus::Success,
            _ => RunStatus::Error,
        };

        let end_time = Utc::now();
        let duration = started.elapsed();

        if let Some(entry) = entry
            && let Err(e) = self.run_log.close(entry.id, end_time, status).await
        {
            tracing::warn!("Failed to close run log entry {}: {}", entry.id, e);
        }

        let summary = RunSummary {
            kind,
            label,
            text: kind.text().to_string(),
            start_time,
            end_time,
            duration,
            status,
            report,
        };

        if let Err(e) = self.notifier.notify(&summary.message()).await {
            tracing::warn!("Failed to send notification for {}: {}", summary.label, e);
        }

        if status == RunStatus::Success {
            tracing::info!("{} finished: {}", summary.label, status);
        } else {
            tracing::error!("{} finished: {}", summary.label, status);
        }
        tracing::info!("Execution time: {}", format_duration(duration));

        summary
    }

    /// Run jobs in the given order; a failed job does not stop later ones.
    pub async fn run_all(&self, kinds: &[JobKind], max_depth: Option<i32>) -> Vec<RunSummary> {
        let mut summaries = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            summaries.push(self.run(kind, max_depth).await);
        }
        summaries
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use treehub_core::result::AppResult;
    use treehub_database::MemoryRunLog;

    use super::*;
    use crate::jobs::testing::{Fixture, abc, fixture};

    #[derive(Debug, Default)]
    struct Recorder {
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn notify(&self, message: &str) -> AppResult<()> {
            self.messages.lock().await.push(message.to_string());
            Ok(())
        }
    }

    fn orchestrator(fx: &Fixture) -> (RunOrchestrator, Arc<MemoryRunLog>, Arc<Recorder>) {
        let log = Arc::new(MemoryRunLog::new());
        let recorder = Arc::new(Recorder::default());
        let orchestrator = RunOrchestrator::new(
            Arc::new(JobExecutor::with_defaults()),
            fx.ctx.clone(),
            log.clone(),
            recorder.clone(),
            "1.2.3",
        );
        (orchestrator, log, recorder)
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0h 0m 0s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[tokio::test]
    async fn test_successful_run_is_logged_and_announced() {
        let fx = fixture(abc());
        let (orchestrator, log, recorder) = orchestrator(&fx);

        let summary = orchestrator.run(JobKind::Emptiness, None).await;
        assert_eq!(summary.status, RunStatus::Success);
        assert_eq!(summary.label, "4/8 EMPTINESS");

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].run_type, "4/8 EMPTINESS");
        assert_eq!(entries[0].status, RunStatus::Success);
        assert!(entries[0].end_time.is_some());

        let messages = recorder.messages.lock().await;
        assert_eq!(
            messages.as_slice(),
            ["4/8 EMPTINESS | Find empty folders | success"]
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_jobs() {
        let fx = fixture(abc());
        fx.nodes.set_unavailable(true);
        let (orchestrator, log, recorder) = orchestrator(&fx);

        let summaries = orchestrator
            .run_all(&[JobKind::Reset, JobKind::Ancestors], None)
            .await;
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.status == RunStatus::Error));
        assert_eq!(log.entries().len(), 2);
        assert_eq!(recorder.messages.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unregistered_job_reports_error() {
        let fx = fixture(abc());
        let log = Arc::new(MemoryRunLog::new());
        let orchestrator = RunOrchestrator::new(
            Arc::new(JobExecutor::new()),
            fx.ctx.clone(),
            log.clone(),
            Arc::new(crate::notify::NoopNotifier),
            "1.2.3",
        );
        let summary = orchestrator.run(JobKind::Sync, None).await;
        assert_eq!(summary.status, RunStatus::Error);
        assert!(summary.report.is_none());
        assert_eq!(log.entries()[0].status, RunStatus::Error);
    }
}
