//! Folder modification dates, propagated leaf to root.

use chrono::{DateTime, Utc};

use async_trait::async_trait;

use treehub_database::{NodeField, NodePatch};
use treehub_entity::Node;

use crate::context::EngineContext;
use crate::executor::{JobHandler, JobKind, JobReport};
use crate::fold::{BottomUpRule, ParentScope};

/// A folder's `updated` becomes the latest `updated` among its non-empty,
/// non-warning direct children. Folders without such children keep theirs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastModified;

impl BottomUpRule for LastModified {
    type Acc = Option<DateTime<Utc>>;

    fn name(&self) -> &'static str {
        "modified"
    }

    fn child_fields(&self) -> &'static [NodeField] {
        &[NodeField::IsEmpty, NodeField::IsWarning, NodeField::Updated]
    }

    fn parent_fields(&self) -> &'static [NodeField] {
        &[NodeField::Updated]
    }

    fn scope(&self) -> ParentScope {
        ParentScope::FoldKeys
    }

    fn accepts(&self, child: &Node) -> bool {
        child.updated.is_some() && !child.is_empty && !child.is_warning
    }

    fn fold(&self, latest: &mut Option<DateTime<Utc>>, child: &Node) {
        *latest = (*latest).max(child.updated);
    }

    fn patch(&self, parent: &Node, latest: Option<&Option<DateTime<Utc>>>) -> Option<NodePatch> {
        let latest = latest.copied().flatten()?;
        (parent.updated != Some(latest)).then(|| NodePatch {
            updated: Some(latest),
            ..NodePatch::default()
        })
    }
}

/// Recomputes folder modification dates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifiedJob;

#[async_trait]
impl JobHandler for ModifiedJob {
    fn kind(&self) -> JobKind {
        JobKind::Modified
    }

    async fn execute(&self, ctx: &EngineContext, max_depth: Option<i32>) -> JobReport {
        let pass = super::foldmachine(ctx).bottom_up(&LastModified, max_depth).await;
        JobReport::from_pass(self.kind(), pass)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::jobs::emptiness::EmptinessJob;
    use crate::jobs::testing::fixture;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).single().expect("date")
    }

    fn tree() -> Vec<Node> {
        let mut junk = Node::file("junk", Some("a"), 2, "x.lnk").with_updated(at(30));
        junk.is_warning = true;
        vec![
            Node::folder("r", None, 0, "r").with_updated(at(1)),
            Node::folder("a", Some("r"), 1, "a").with_updated(at(1)),
            Node::file("a1", Some("a"), 2, "a1.txt").with_updated(at(5)),
            Node::file("a2", Some("a"), 2, "a2.txt").with_updated(at(9)),
            junk,
            Node::folder("e", Some("r"), 1, "e").with_updated(at(20)),
            Node::folder("k", Some("r"), 1, "k").with_updated(at(3)),
        ]
    }

    #[tokio::test]
    async fn test_latest_qualifying_child_wins() {
        let fx = fixture(tree());
        EmptinessJob.execute(&fx.ctx, None).await;
        let report = ModifiedJob.execute(&fx.ctx, None).await;
        assert!(report.is_success());

        // junk (day 30) is a warning, e is empty (day 20)
        assert_eq!(fx.nodes.get("a").expect("a").updated, Some(at(9)));
        assert_eq!(fx.nodes.get("r").expect("r").updated, Some(at(9)));
    }

    #[tokio::test]
    async fn test_folder_without_qualifying_children_is_unchanged() {
        let fx = fixture(tree());
        EmptinessJob.execute(&fx.ctx, None).await;
        ModifiedJob.execute(&fx.ctx, None).await;
        assert_eq!(fx.nodes.get("e").expect("e").updated, Some(at(20)));
        assert_eq!(fx.nodes.get("k").expect("k").updated, Some(at(3)));
    }

    #[tokio::test]
    async fn test_idempotent() {
        let fx = fixture(tree());
        EmptinessJob.execute(&fx.ctx, None).await;
        ModifiedJob.execute(&fx.ctx, None).await;
        let second = ModifiedJob.execute(&fx.ctx, None).await;
        assert_eq!(second.modified(), 0);
    }
}
