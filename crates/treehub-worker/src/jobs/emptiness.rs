//! Folder emptiness, propagated leaf to root.

use async_trait::async_trait;
use tracing::{info, warn};

use treehub_database::{NodeField, NodeFilter, NodePatch};
use treehub_entity::Node;

use crate::context::EngineContext;
use crate::executor::{JobHandler, JobKind, JobReport};
use crate::fold::{BottomUpRule, ParentScope};

/// A folder is non-empty iff some direct child is a non-warning file or a
/// non-warning, non-empty folder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Emptiness;

impl BottomUpRule for Emptiness {
    type Acc = bool;

    fn name(&self) -> &'static str {
        "emptiness"
    }

    fn child_fields(&self) -> &'static [NodeField] {
        &[NodeField::IsEmpty, NodeField::IsWarning]
    }

    fn parent_fields(&self) -> &'static [NodeField] {
        &[NodeField::IsEmpty]
    }

    fn scope(&self) -> ParentScope {
        ParentScope::AllFolders
    }

    fn accepts(&self, child: &Node) -> bool {
        !child.is_warning && (child.is_file() || !child.is_empty)
    }

    fn fold(&self, has_content: &mut bool, _child: &Node) {
        *has_content = true;
    }

    fn patch(&self, parent: &Node, has_content: Option<&bool>) -> Option<NodePatch> {
        let is_empty = !has_content.copied().unwrap_or(false);
        (parent.is_empty != is_empty).then(|| NodePatch {
            is_empty: Some(is_empty),
            ..NodePatch::default()
        })
    }
}

/// Recomputes emptiness for every folder and logs the total.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptinessJob;

#[async_trait]
impl JobHandler for EmptinessJob {
    fn kind(&self) -> JobKind {
        JobKind::Emptiness
    }

    async fn execute(&self, ctx: &EngineContext, max_depth: Option<i32>) -> JobReport {
        let pass = super::foldmachine(ctx).bottom_up(&Emptiness, max_depth).await;
        let mut report = JobReport::from_pass(self.kind(), pass);

        match ctx.nodes.count(&NodeFilter::all().with_empty(true)).await {
            Ok(total) => {
                info!(total, "Total empty folders");
                report.total("empty_folders", total);
            }
            Err(e) => warn!(error = %e, "Failed to count empty folders"),
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use treehub_database::NodeStore;

    use super::*;
    use crate::jobs::extensions::ExtensionsJob;
    use crate::jobs::testing::{abc, deep, fixture};

    #[tokio::test]
    async fn test_abc_scenario() {
        let fx = fixture(abc());
        let emptiness = EmptinessJob.execute(&fx.ctx, None).await;
        let extensions = ExtensionsJob.execute(&fx.ctx, None).await;
        assert!(emptiness.is_success());
        assert!(extensions.is_success());

        let a = fx.nodes.get("A").expect("A");
        let c = fx.nodes.get("C").expect("C");
        assert!(!a.is_empty);
        assert_eq!(a.files_ext, vec!["txt"]);
        assert!(c.is_empty);
        assert_eq!(emptiness.get("empty_folders"), Some(1));
    }

    #[tokio::test]
    async fn test_warning_children_do_not_count() {
        let fx = fixture(deep());
        EmptinessJob.execute(&fx.ctx, None).await;

        // aa holds only Thumbs.db
        assert!(fx.nodes.get("aa").expect("aa").is_empty);
        assert!(!fx.nodes.get("a").expect("a").is_empty);
        assert!(!fx.nodes.get("bb").expect("bb").is_empty);
        assert!(!fx.nodes.get("b").expect("b").is_empty);
        assert!(!fx.nodes.get("r").expect("r").is_empty);
    }

    #[tokio::test]
    async fn test_emptiness_cascades_upwards() {
        let nodes = vec![
            Node::folder("r", None, 0, "r"),
            Node::folder("x", Some("r"), 1, "x"),
            Node::folder("y", Some("x"), 2, "y"),
            Node::folder("z", Some("y"), 3, "z"),
        ];
        let fx = fixture(nodes);
        EmptinessJob.execute(&fx.ctx, None).await;
        for id in ["r", "x", "y", "z"] {
            assert!(fx.nodes.get(id).expect("node").is_empty, "{id} should be empty");
        }
    }

    #[tokio::test]
    async fn test_property_matches_direct_children() {
        let fx = fixture(deep());
        EmptinessJob.execute(&fx.ctx, None).await;

        let all = fx
            .nodes
            .find_page(&NodeFilter::all(), &[], None, 100)
            .await
            .expect("page")
            .nodes;
        for folder in all.iter().filter(|n| n.is_folder()) {
            let qualifying = all
                .iter()
                .filter(|c| c.parent_id.as_deref() == Some(folder.id.as_str()))
                .any(|c| !c.is_warning && (c.is_file() || !c.is_empty));
            assert_eq!(folder.is_empty, !qualifying, "folder {}", folder.id);
        }
    }

    #[tokio::test]
    async fn test_idempotent() {
        let fx = fixture(deep());
        EmptinessJob.execute(&fx.ctx, None).await;
        let second = EmptinessJob.execute(&fx.ctx, None).await;
        assert_eq!(second.modified(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_level_is_reported_and_pass_continues() {
        let fx = fixture(deep());
        fx.nodes.fail_reads_at_depth(Some(2));
        let report = EmptinessJob.execute(&fx.ctx, None).await;
        assert!(!report.is_success());

        let pass = &report.passes[0];
        let failed: Vec<i32> = pass
            .levels
            .iter()
            .filter(|l| l.error.is_some())
            .map(|l| l.depth)
            .collect();
        // depth 2 is read as parents of level 2 and as children of level 1
        assert_eq!(failed, vec![2, 1]);
        assert_eq!(pass.levels.len(), 4);
        // the root level still ran
        assert!(!fx.nodes.get("r").expect("r").is_empty);
    }

    #[tokio::test]
    async fn test_empty_store_is_a_noop() {
        let fx = fixture(Vec::new());
        let report = EmptinessJob.execute(&fx.ctx, None).await;
        assert!(report.is_success());
        assert!(report.passes[0].levels.is_empty());
        assert_eq!(report.passes[0].max_depth, None);
    }
}
