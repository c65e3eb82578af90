//! Job registry and executor.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use treehub_core::error::AppError;

use crate::context::EngineContext;
use crate::fold::{Direction, PassSummary};
use crate::jobs;

/// Every job the engine can run, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Reconcile the staging table into the live table.
    Sync,
    /// Reset derived fields before propagation.
    Reset,
    /// Flag junk artifacts.
    Warnings,
    /// Folder emptiness, leaf to root.
    Emptiness,
    /// Folder modification dates, leaf to root.
    Modified,
    /// Folder extension sets, leaf to root.
    Extensions,
    /// Ancestor chains, root to leaf.
    Ancestors,
    /// Reference-dataset links, root to leaf.
    Links,
}

impl JobKind {
    /// All jobs in pipeline order.
    pub const ALL: [JobKind; 8] = [
        Self::Sync,
        Self::Reset,
        Self::Warnings,
        Self::Emptiness,
        Self::Modified,
        Self::Extensions,
        Self::Ancestors,
        Self::Links,
    ];

    /// 1-based position in the pipeline.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|k| k == self).map_or(0, |i| i + 1)
    }

    /// Lowercase identifier used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Reset => "reset",
            Self::Warnings => "warnings",
            Self::Emptiness => "emptiness",
            Self::Modified => "modified",
            Self::Extensions => "extensions",
            Self::Ancestors => "ancestors",
            Self::Links => "links",
        }
    }

    /// Upper-case display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sync => "SYNC",
            Self::Reset => "RESET",
            Self::Warnings => "WARNINGS",
            Self::Emptiness => "EMPTINESS",
            Self::Modified => "MODIFIED",
            Self::Extensions => "EXTENSIONS",
            Self::Ancestors => "ANCESTORS",
            Self::Links => "LINKS",
        }
    }

    /// Human-readable description.
    pub fn text(&self) -> &'static str {
        match self {
            Self::Sync => "Update data from staging",
            Self::Reset => "Reset derived fields",
            Self::Warnings => "Flag junk files",
            Self::Emptiness => "Find empty folders",
            Self::Modified => "Propagate modification dates to folders",
            Self::Extensions => "Aggregate file extensions",
            Self::Ancestors => "Update ancestor chains",
            Self::Links => "Link nodes to reference data",
        }
    }

    /// Traversal direction, for fold jobs.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::Emptiness | Self::Modified | Self::Extensions => Some(Direction::BottomUp),
            Self::Ancestors | Self::Links => Some(Direction::TopDown),
            Self::Sync | Self::Reset | Self::Warnings => None,
        }
    }

    /// Label such as `"4/8 EMPTINESS"`.
    pub fn label(&self) -> String {
        format!("{}/{} {}", self.index(), Self::ALL.len(), self.name())
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::validation(format!("Unknown job '{s}'")))
    }
}

/// Outcome of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    /// Which job ran.
    pub kind: JobKind,
    /// Level passes performed.
    pub passes: Vec<PassSummary>,
    /// Named counters, e.g. `inserted` or `empty_folders`.
    pub totals: BTreeMap<String, u64>,
    /// Failure outside any level.
    pub error: Option<String>,
}

impl JobReport {
    /// An empty report.
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            passes: Vec::new(),
            totals: BTreeMap::new(),
            error: None,
        }
    }

    /// A report holding one pass.
    pub fn from_pass(kind: JobKind, pass: PassSummary) -> Self {
        let mut report = Self::new(kind);
        report.passes.push(pass);
        report
    }

    /// A report for a job that failed outright.
    pub fn failed(kind: JobKind, error: impl fmt::Display) -> Self {
        let mut report = Self::new(kind);
        report.error = Some(error.to_string());
        report
    }

    /// Set a named counter.
    pub fn total(&mut self, name: &str, value: u64) {
        self.totals.insert(name.to_string(), value);
    }

    /// Read a named counter.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.totals.get(name).copied()
    }

    /// Whether the job and every level it ran completed.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.passes.iter().all(PassSummary::is_success)
    }

    /// Records modified across every pass.
    pub fn modified(&self) -> u64 {
        self.passes.iter().map(PassSummary::modified).sum()
    }
}

/// A runnable job.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// The job this handler runs.
    fn kind(&self) -> JobKind;

    /// Run the job. Failures are reported, never returned.
    async fn execute(&self, ctx: &EngineContext, max_depth: Option<i32>) -> JobReport;
}

/// Dispatches jobs to registered handlers.
#[derive(Debug)]
pub struct JobExecutor {
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create an executor with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Create an executor with every built-in job registered.
    pub fn with_defaults() -> Self {
        let mut executor = Self::new();
        executor.register(Arc::new(jobs::SyncJob));
        executor.register(Arc::new(jobs::ResetJob));
        executor.register(Arc::new(jobs::WarningsJob));
        executor.register(Arc::new(jobs::EmptinessJob));
        executor.register(Arc::new(jobs::ModifiedJob));
        executor.register(Arc::new(jobs::ExtensionsJob));
        executor.register(Arc::new(jobs::AncestorsJob));
        executor.register(Arc::new(jobs::LinksJob));
        executor
    }

    /// Register a handler, replacing any previous one for the same job.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let kind = handler.kind();
        tracing::debug!("Registered job handler for '{}'", kind);
        self.handlers.insert(kind, handler);
    }

    /// Run one job.
    pub async fn execute(
        &self,
        kind: JobKind,
        ctx: &EngineContext,
        max_depth: Option<i32>,
    ) -> Result<JobReport, AppError> {
        let handler = self.handlers.get(&kind).ok_or_else(|| {
            AppError::not_found(format!("No handler registered for job '{kind}'"))
        })?;

        tracing::info!("Executing job '{}' ({})", kind, kind.text());
        Ok(handler.execute(ctx, max_depth).await)
    }

    /// Registered jobs in pipeline order.
    pub fn registered(&self) -> Vec<JobKind> {
        let mut kinds: Vec<JobKind> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl Default for JobExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_and_labels() {
        assert_eq!(JobKind::Sync.index(), 1);
        assert_eq!(JobKind::Links.index(), 8);
        assert_eq!(JobKind::Emptiness.label(), "4/8 EMPTINESS");
        assert_eq!(JobKind::Ancestors.direction(), Some(Direction::TopDown));
        assert_eq!(JobKind::Reset.direction(), None);
    }

    #[test]
    fn test_parse_job_kind() {
        assert_eq!("emptiness".parse::<JobKind>().expect("parse"), JobKind::Emptiness);
        assert_eq!("LINKS".parse::<JobKind>().expect("parse"), JobKind::Links);
        assert!("importer".parse::<JobKind>().is_err());
    }

    #[test]
    fn test_defaults_cover_every_job() {
        let executor = JobExecutor::with_defaults();
        assert_eq!(executor.registered(), JobKind::ALL.to_vec());
    }
}
