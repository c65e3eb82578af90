//! The Foldmachine: level-synchronous attribute passes.
//!
//! A pass visits one depth at a time, in the direction its attribute
//! needs. Each level is a complete read, fold, write cycle, and its writes
//! are flushed before the next level is read, since that read depends on
//! them. A level that fails is reported and the pass moves on.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use treehub_core::result::AppResult;
use treehub_core::types::WriteProgress;
use treehub_database::{NodeField, NodeFilter, NodePatch, NodeStore, NodeUpdate};
use treehub_entity::{Node, NodeType};

use crate::error::PassError;
use crate::reader::LevelReader;
use crate::writer::BatchWriter;

/// Traversal direction of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Root to leaf: children derive from their parent.
    TopDown,
    /// Leaf to root: parents derive from their children.
    BottomUp,
}

/// Which parents a bottom-up level writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentScope {
    /// Every folder at the level, including childless ones.
    AllFolders,
    /// Only parents that received at least one accepted child.
    FoldKeys,
}

/// A leaf-to-root attribute.
pub trait BottomUpRule: Send + Sync {
    /// Accumulated state per parent.
    type Acc: Default + Send;

    /// Pass name, for logs.
    fn name(&self) -> &'static str;

    /// Child fields the fold reads.
    fn child_fields(&self) -> &'static [NodeField];

    /// Parent fields needed to decide whether a write is required.
    fn parent_fields(&self) -> &'static [NodeField];

    /// Which parents are written.
    fn scope(&self) -> ParentScope;

    /// Whether a child takes part in the fold at all.
    fn accepts(&self, _child: &Node) -> bool {
        true
    }

    /// Combine one child into its parent's accumulator.
    fn fold(&self, acc: &mut Self::Acc, child: &Node);

    /// The update for `parent`, or `None` when its stored value is already
    /// correct. `acc` is `None` when no accepted child exists.
    fn patch(&self, parent: &Node, acc: Option<&Self::Acc>) -> Option<NodePatch>;
}

/// A root-to-leaf attribute.
pub trait TopDownRule: Send + Sync {
    /// Pass name, for logs.
    fn name(&self) -> &'static str;

    /// Parent fields children derive from.
    fn parent_fields(&self) -> &'static [NodeField];

    /// Child fields needed to decide whether a write is required.
    fn child_fields(&self) -> &'static [NodeField];

    /// The update for a root, if roots carry a fixed value.
    fn root_patch(&self, _root: &Node) -> Option<NodePatch> {
        None
    }

    /// The update for `child` given its parent, or `None` when unchanged.
    fn patch(&self, parent: &Node, child: &Node) -> Option<NodePatch>;
}

/// Outcome of one level.
///
/// `depth` is the level written: the parent depth for bottom-up passes,
/// the child depth for top-down ones.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LevelReport {
    /// Level written.
    pub depth: i32,
    /// Parents read.
    pub parents: usize,
    /// Children read.
    pub children: usize,
    /// Records skipped as malformed.
    pub malformed: usize,
    /// Bulk-write totals for the level.
    pub write: WriteProgress,
    /// Failure, if the level did not complete.
    pub error: Option<String>,
}

impl LevelReport {
    fn new(depth: i32) -> Self {
        Self {
            depth,
            ..Self::default()
        }
    }
}

/// Outcome of a full pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassSummary {
    /// Pass name.
    pub name: String,
    /// Deepest level present when the pass started.
    pub max_depth: Option<i32>,
    /// Per-level reports in processing order.
    pub levels: Vec<LevelReport>,
    /// Failure that prevented the pass from starting.
    pub error: Option<String>,
}

impl PassSummary {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Whether every level completed.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.levels.iter().all(|l| l.error.is_none())
    }

    /// Records modified across all levels.
    pub fn modified(&self) -> u64 {
        self.levels.iter().map(|l| l.write.modified).sum()
    }

    /// Records skipped as malformed across all levels.
    pub fn malformed(&self) -> usize {
        self.levels.iter().map(|l| l.malformed).sum()
    }

    /// Add a level report, logging its outcome.
    pub fn push_level(&mut self, report: LevelReport) {
        match &report.error {
            None => info!(
                pass = %self.name,
                depth = report.depth,
                staged = report.write.staged,
                matched = report.write.matched,
                modified = report.write.modified,
                "Level complete"
            ),
            Some(e) => error!(
                pass = %self.name,
                depth = report.depth,
                staged = report.write.staged,
                modified = report.write.modified,
                error = %e,
                "Level failed"
            ),
        }
        self.levels.push(report);
    }

    /// Record a level outcome.
    pub fn record(&mut self, mut report: LevelReport, outcome: Result<(), PassError>) {
        if let Err(e) = outcome {
            report.write = e.progress();
            report.error = Some(e.to_string());
        }
        self.push_level(report);
    }
}

/// Drives attribute passes over one node store.
#[derive(Debug, Clone)]
pub struct Foldmachine {
    store: Arc<dyn NodeStore>,
    batch_size: usize,
    page_size: usize,
}

impl Foldmachine {
    /// Create a driver.
    pub fn new(store: Arc<dyn NodeStore>, batch_size: usize, page_size: usize) -> Self {
        Self {
            store,
            batch_size,
            page_size,
        }
    }

    /// Deepest level in the store.
    pub async fn max_depth(&self) -> AppResult<Option<i32>> {
        self.store.max_depth().await
    }

    async fn resolve_depth(&self, summary: &mut PassSummary, max_depth: Option<i32>) -> Option<i32> {
        let resolved = match max_depth {
            Some(d) => Some(d),
            None => match self.max_depth().await {
                Ok(d) => d,
                Err(e) => {
                    error!(pass = %summary.name, error = %e, "Failed to read max depth");
                    summary.error = Some(e.to_string());
                    return None;
                }
            },
        };
        summary.max_depth = resolved;
        if resolved.is_none() {
            info!(pass = %summary.name, "Store is empty, nothing to do");
        }
        resolved
    }

    /// Run a leaf-to-root pass, parents from `max_depth` down to the roots.
    pub async fn bottom_up<R: BottomUpRule>(&self, rule: &R, max_depth: Option<i32>) -> PassSummary {
        let mut summary = PassSummary::new(rule.name());
        let Some(max_depth) = self.resolve_depth(&mut summary, max_depth).await else {
            return summary;
        };
        info!(pass = rule.name(), max_depth, direction = "bottom_up", "Pass started");

        for depth in (0..=max_depth).rev() {
            let mut report = LevelReport::new(depth);
            let outcome = self.bottom_up_level(rule, depth, &mut report).await;
            summary.record(report, outcome);
        }
        summary
    }

    async fn bottom_up_level<R: BottomUpRule>(
        &self,
        rule: &R,
        depth: i32,
        report: &mut LevelReport,
    ) -> Result<(), PassError> {
        let reader = LevelReader::new(self.store.as_ref(), self.page_size);

        let mut folds: HashMap<String, R::Acc> = HashMap::new();
        let mut cursor = reader.cursor(NodeFilter::at_depth(depth + 1), rule.child_fields());
        while let Some(batch) = cursor.next_batch().await.map_err(PassError::read)? {
            for child in batch {
                report.children += 1;
                if !rule.accepts(&child) {
                    continue;
                }
                if let Some(parent_id) = child.parent_id.as_deref() {
                    let acc = folds.entry(parent_id.to_string()).or_default();
                    rule.fold(acc, &child);
                }
            }
        }
        report.malformed += cursor.malformed();

        let parent_filter = NodeFilter::at_depth(depth).of_type(NodeType::Folder);
        let parents = match rule.scope() {
            ParentScope::AllFolders => reader.read(parent_filter, rule.parent_fields()).await,
            ParentScope::FoldKeys => {
                if folds.is_empty() {
                    return Ok(());
                }
                let mut keys: Vec<String> = folds.keys().cloned().collect();
                keys.sort_unstable();
                reader
                    .read_ids(parent_filter, &keys, rule.parent_fields())
                    .await
            }
        }
        .map_err(PassError::read)?;
        report.parents = parents.nodes.len();
        report.malformed += parents.malformed;

        let updates: Vec<NodeUpdate> = parents
            .nodes
            .iter()
            .filter_map(|parent| {
                rule.patch(parent, folds.get(&parent.id))
                    .map(|patch| NodeUpdate::new(parent.id.clone(), patch))
            })
            .collect();

        self.write(updates, report).await
    }

    /// Run a root-to-leaf pass: roots first, then children of depth
    /// `0..max_depth`.
    pub async fn top_down<R: TopDownRule>(&self, rule: &R, max_depth: Option<i32>) -> PassSummary {
        let mut summary = PassSummary::new(rule.name());
        let Some(max_depth) = self.resolve_depth(&mut summary, max_depth).await else {
            return summary;
        };
        info!(pass = rule.name(), max_depth, direction = "top_down", "Pass started");

        let mut report = LevelReport::new(0);
        let outcome = self.top_down_roots(rule, &mut report).await;
        summary.record(report, outcome);

        for depth in 0..max_depth {
            let mut report = LevelReport::new(depth + 1);
            let outcome = self.top_down_level(rule, depth, &mut report).await;
            summary.record(report, outcome);
        }
        summary
    }

    async fn top_down_roots<R: TopDownRule>(
        &self,
        rule: &R,
        report: &mut LevelReport,
    ) -> Result<(), PassError> {
        let reader = LevelReader::new(self.store.as_ref(), self.page_size);
        let roots = reader
            .read_level(0, rule.child_fields())
            .await
            .map_err(PassError::read)?;
        report.children = roots.nodes.len();
        report.malformed = roots.malformed;

        let updates: Vec<NodeUpdate> = roots
            .nodes
            .iter()
            .filter_map(|root| {
                rule.root_patch(root)
                    .map(|patch| NodeUpdate::new(root.id.clone(), patch))
            })
            .collect();
        self.write(updates, report).await
    }

    async fn top_down_level<R: TopDownRule>(
        &self,
        rule: &R,
        depth: i32,
        report: &mut LevelReport,
    ) -> Result<(), PassError> {
        let reader = LevelReader::new(self.store.as_ref(), self.page_size);

        let parents = reader
            .read(
                NodeFilter::at_depth(depth).of_type(NodeType::Folder),
                rule.parent_fields(),
            )
            .await
            .map_err(PassError::read)?;
        report.parents = parents.nodes.len();
        report.malformed += parents.malformed;
        let parents: HashMap<String, Node> = parents
            .nodes
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut updates = Vec::new();
        let mut orphans = 0usize;
        let mut cursor = reader.cursor(NodeFilter::at_depth(depth + 1), rule.child_fields());
        while let Some(batch) = cursor.next_batch().await.map_err(PassError::read)? {
            for child in batch {
                report.children += 1;
                let parent = child.parent_id.as_deref().and_then(|id| parents.get(id));
                match parent {
                    Some(parent) => {
                        if let Some(patch) = rule.patch(parent, &child) {
                            updates.push(NodeUpdate::new(child.id.clone(), patch));
                        }
                    }
                    None => orphans += 1,
                }
            }
        }
        report.malformed += cursor.malformed();
        if orphans > 0 {
            warn!(
                pass = rule.name(),
                depth = depth + 1,
                orphans,
                "Skipping children whose parent is not a folder at the level above"
            );
            report.malformed += orphans;
        }

        self.write(updates, report).await
    }

    async fn write(&self, updates: Vec<NodeUpdate>, report: &mut LevelReport) -> Result<(), PassError> {
        let mut writer = BatchWriter::new(self.store.as_ref(), self.batch_size);
        writer.stage_all(updates).await?;
        writer.flush().await?;
        report.write = writer.progress();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::{deep, fixture};
    use crate::jobs::{AncestorChain, Emptiness};

    fn machine(store: Arc<dyn NodeStore>) -> Foldmachine {
        Foldmachine::new(store, 10, 10)
    }

    #[tokio::test]
    async fn test_rejected_level_does_not_stop_the_pass() {
        let fx = fixture(deep());
        fx.nodes.reject_bulk_writes(true);

        let summary = machine(fx.nodes.clone()).bottom_up(&Emptiness, None).await;
        let depths: Vec<i32> = summary.levels.iter().map(|l| l.depth).collect();
        assert_eq!(depths, vec![3, 2, 1, 0]);
        assert!(!summary.is_success());

        let failed: Vec<i32> = summary
            .levels
            .iter()
            .filter(|l| l.error.is_some())
            .map(|l| l.depth)
            .collect();
        assert_eq!(failed, vec![2]);
        assert!(fx.nodes.get("aa").is_some_and(|n| !n.is_empty));
    }

    #[tokio::test]
    async fn test_explicit_max_depth_limits_top_down() {
        let fx = fixture(deep());
        let summary = machine(fx.nodes.clone())
            .top_down(&AncestorChain, Some(1))
            .await;

        assert_eq!(summary.levels.len(), 2);
        assert!(summary.is_success());
        assert!(fx.nodes.get("a").is_some_and(|n| n.ancestor_ids == ["r"]));
        assert!(fx.nodes.get("aa").is_some_and(|n| n.ancestor_ids.is_empty()));
    }

    #[tokio::test]
    async fn test_empty_store_runs_no_levels() {
        let fx = fixture(Vec::new());
        let summary = machine(fx.nodes.clone()).bottom_up(&Emptiness, None).await;
        assert!(summary.levels.is_empty());
        assert!(summary.is_success());
        assert_eq!(summary.max_depth, None);
    }
}
