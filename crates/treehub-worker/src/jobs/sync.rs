//! Staging to live reconciliation.
//!
//! Three streaming phases: mark every live node unseen and every staged
//! node seen; walk the staging table page by page, marking live
//! counterparts seen and inserting the missing ones; delete live nodes
//! still unseen. Nothing is deleted unless the first two phases completed.
//!
//! A live row that exists but fails validation is overwritten by its
//! staged copy instead of being treated as absent.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use treehub_core::types::WriteProgress;
use treehub_database::{NodeField, NodeFilter, NodePatch, NodeUpdate};

use crate::context::EngineContext;
use crate::error::PassError;
use crate::executor::{JobHandler, JobKind, JobReport};
use crate::reader::LevelReader;
use crate::writer::BatchWriter;

/// Counters from one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Live nodes also present in staging.
    pub marked_seen: u64,
    /// Staged nodes inserted into the live table.
    pub inserted: u64,
    /// Malformed live nodes overwritten by their staged copy.
    pub replaced: u64,
    /// Live nodes absent from staging, deleted.
    pub deleted: u64,
    /// Staged records skipped as malformed.
    pub malformed: u64,
}

fn seen(checked: bool) -> NodePatch {
    NodePatch {
        checked: Some(checked),
        ..NodePatch::default()
    }
}

/// Reconcile `ctx.staging` into `ctx.nodes`.
pub async fn reconcile(ctx: &EngineContext) -> Result<SyncReport, PassError> {
    let mut report = SyncReport::default();
    let batch_size = ctx.config.batch_size.max(1);

    let unmarked = ctx
        .nodes
        .update_many(&NodeFilter::all(), &seen(false))
        .await
        .map_err(|e| PassError::write(WriteProgress::default(), e))?;
    let staged = ctx
        .staging
        .update_many(&NodeFilter::all(), &seen(true))
        .await
        .map_err(|e| PassError::write(WriteProgress::default(), e))?;
    info!(live = unmarked, staged, "Marked live nodes unseen and staged nodes seen");

    let staging = LevelReader::new(ctx.staging.as_ref(), ctx.config.page_size);
    let live = LevelReader::new(ctx.nodes.as_ref(), ctx.config.page_size);
    let mut writer = BatchWriter::new(ctx.nodes.as_ref(), batch_size);

    let mut cursor = staging.cursor(NodeFilter::all(), &[]);
    while let Some(batch) = cursor.next_batch().await.map_err(PassError::read)? {
        let ids: Vec<String> = batch.iter().map(|n| n.id.clone()).collect();
        let valid: HashSet<String> = live
            .read_ids(NodeFilter::all(), &ids, &[NodeField::Id])
            .await
            .map_err(PassError::read)?
            .nodes
            .into_iter()
            .map(|n| n.id)
            .collect();
        let present: HashSet<String> = ctx
            .nodes
            .existing_ids(&ids)
            .await
            .map_err(PassError::read)?
            .into_iter()
            .collect();

        let mut missing = Vec::new();
        let mut unreadable = Vec::new();
        for mut node in batch {
            if valid.contains(&node.id) {
                writer.stage(NodeUpdate::new(node.id, seen(true))).await?;
                continue;
            }
            node.checked = true;
            if present.contains(&node.id) {
                unreadable.push(node);
            } else {
                missing.push(node);
            }
        }

        if !unreadable.is_empty() {
            let ids: Vec<String> = unreadable.iter().map(|n| n.id.clone()).collect();
            warn!(count = ids.len(), "Replacing malformed live nodes with their staged copies");
            ctx.nodes
                .delete_many(&NodeFilter::by_ids(ids))
                .await
                .map_err(|e| PassError::write(writer.progress(), e))?;
            report.replaced += ctx
                .nodes
                .insert_many(unreadable)
                .await
                .map_err(|e| PassError::write(writer.progress(), e))?;
        }
        for chunk in missing.chunks(batch_size) {
            report.inserted += ctx
                .nodes
                .insert_many(chunk.to_vec())
                .await
                .map_err(|e| PassError::write(writer.progress(), e))?;
        }
    }
    writer.flush().await?;
    report.marked_seen = writer.progress().matched;
    report.malformed = cursor.malformed() as u64;
    info!(
        marked_seen = report.marked_seen,
        inserted = report.inserted,
        replaced = report.replaced,
        malformed = report.malformed,
        "Staging streamed"
    );

    report.deleted = ctx
        .nodes
        .delete_many(&NodeFilter::all().with_checked(false))
        .await
        .map_err(|e| PassError::write(writer.progress(), e))?;
    info!(deleted = report.deleted, "Deleted nodes absent from staging");

    Ok(report)
}

/// Runs [`reconcile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncJob;

#[async_trait]
impl JobHandler for SyncJob {
    fn kind(&self) -> JobKind {
        JobKind::Sync
    }

    async fn execute(&self, ctx: &EngineContext, _max_depth: Option<i32>) -> JobReport {
        match reconcile(ctx).await {
            Ok(sync) => {
                let mut report = JobReport::new(self.kind());
                report.total("marked_seen", sync.marked_seen);
                report.total("inserted", sync.inserted);
                report.total("replaced", sync.replaced);
                report.total("deleted", sync.deleted);
                report.total("malformed", sync.malformed);
                report
            }
            Err(e) => {
                error!(error = %e, "Sync aborted before deleting unseen nodes");
                JobReport::failed(self.kind(), e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use treehub_core::config::EngineConfig;
    use treehub_database::NodeStore;
    use treehub_entity::Node;

    use super::*;
    use crate::jobs::testing::fixture_with;

    fn snapshot() -> Vec<Node> {
        vec![
            Node::folder("a", None, 0, "a"),
            Node::file("b", Some("a"), 1, "b.txt"),
            Node::folder("c", Some("a"), 1, "c"),
        ]
    }

    #[tokio::test]
    async fn test_identical_tables_change_nothing() {
        let fx = fixture_with(snapshot(), snapshot(), EngineConfig::default());
        let report = SyncJob.execute(&fx.ctx, None).await;
        assert!(report.is_success());
        assert_eq!(report.get("inserted"), Some(0));
        assert_eq!(report.get("deleted"), Some(0));
        assert_eq!(report.get("marked_seen"), Some(3));
        assert_eq!(fx.nodes.len(), 3);
    }

    #[tokio::test]
    async fn test_three_new_two_stale() {
        let mut live = snapshot();
        live.push(Node::file("old1", Some("a"), 1, "old1.txt"));
        live.push(Node::file("old2", Some("c"), 2, "old2.txt"));

        let mut staging = snapshot();
        staging.push(Node::file("new1", Some("a"), 1, "n1.txt"));
        staging.push(Node::file("new2", Some("c"), 2, "n2.txt"));
        staging.push(Node::folder("new3", Some("a"), 1, "n3"));

        let fx = fixture_with(live, staging, EngineConfig::default());
        let before = fx.nodes.len();
        let report = SyncJob.execute(&fx.ctx, None).await;

        assert!(report.is_success());
        assert_eq!(report.get("inserted"), Some(3));
        assert_eq!(report.get("deleted"), Some(2));
        assert_eq!(fx.nodes.len(), before + 3 - 2);
        assert!(fx.nodes.get("old1").is_none());
        assert!(fx.nodes.get("old2").is_none());
        assert!(fx.nodes.get("new3").is_some_and(|n| n.is_folder()));
    }

    #[tokio::test]
    async fn test_small_pages_and_batches() {
        let staging: Vec<Node> = (0..23)
            .map(|i| Node::folder(format!("n{i:02}"), None, 0, format!("n{i}")))
            .collect();
        let live: Vec<Node> = staging.iter().take(10).cloned().collect();
        let config = EngineConfig {
            batch_size: 4,
            page_size: 5,
            ..EngineConfig::default()
        };
        let fx = fixture_with(live, staging, config);
        let report = SyncJob.execute(&fx.ctx, None).await;

        assert_eq!(report.get("inserted"), Some(13));
        assert_eq!(report.get("marked_seen"), Some(10));
        assert_eq!(fx.nodes.len(), 23);
        assert!(fx.nodes.bulk_request_sizes().await.iter().all(|&n| n <= 4));
        assert_eq!(
            fx.nodes
                .count(&NodeFilter::all().with_checked(true))
                .await
                .expect("count"),
            23
        );
    }

    #[tokio::test]
    async fn test_malformed_live_copy_is_replaced_not_deleted() {
        let live = vec![
            Node::folder("a", None, 0, "a"),
            Node::folder("c", None, 1, "c"),
        ];
        let staging = vec![
            Node::folder("a", None, 0, "a"),
            Node::folder("c", Some("a"), 1, "c"),
        ];
        let fx = fixture_with(live, staging, EngineConfig::default());
        let report = SyncJob.execute(&fx.ctx, None).await;

        assert!(report.is_success());
        assert_eq!(report.get("deleted"), Some(0));
        assert_eq!(report.get("inserted"), Some(0));
        assert_eq!(report.get("replaced"), Some(1));
        let c = fx.nodes.get("c").expect("c kept");
        assert_eq!(c.parent_id.as_deref(), Some("a"));
        assert!(c.checked);
        assert!(c.validate().is_ok());
    }

    #[tokio::test]
    async fn test_unavailable_staging_deletes_nothing() {
        let fx = fixture_with(snapshot(), Vec::new(), EngineConfig::default());
        fx.staging.set_unavailable(true);
        let report = SyncJob.execute(&fx.ctx, None).await;
        assert!(!report.is_success());
        assert_eq!(fx.nodes.len(), 3);
    }
}
