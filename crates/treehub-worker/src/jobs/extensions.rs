//! Folder extension sets, aggregated leaf to root.

use std::collections::BTreeSet;

use async_trait::async_trait;

use treehub_database::{NodeField, NodePatch};
use treehub_entity::Node;

use crate::context::EngineContext;
use crate::executor::{JobHandler, JobKind, JobReport};
use crate::fold::{BottomUpRule, ParentScope};

/// `filesExt[folder]` is the union of direct files' extensions and direct
/// sub-folders' `filesExt`, stored sorted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionSet;

impl BottomUpRule for ExtensionSet {
    type Acc = BTreeSet<String>;

    fn name(&self) -> &'static str {
        "extensions"
    }

    fn child_fields(&self) -> &'static [NodeField] {
        &[NodeField::Ext, NodeField::FilesExt]
    }

    fn parent_fields(&self) -> &'static [NodeField] {
        &[NodeField::FilesExt]
    }

    fn scope(&self) -> ParentScope {
        ParentScope::AllFolders
    }

    fn fold(&self, acc: &mut BTreeSet<String>, child: &Node) {
        if child.is_folder() {
            acc.extend(child.files_ext.iter().cloned());
        } else if let Some(ext) = &child.ext {
            acc.insert(ext.clone());
        }
    }

    fn patch(&self, parent: &Node, acc: Option<&BTreeSet<String>>) -> Option<NodePatch> {
        let files_ext: Vec<String> = acc.map(|s| s.iter().cloned().collect()).unwrap_or_default();
        let mut current = parent.files_ext.clone();
        current.sort();
        current.dedup();
        (current != files_ext).then(|| NodePatch {
            files_ext: Some(files_ext),
            ..NodePatch::default()
        })
    }
}

/// Recomputes every folder's extension set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionsJob;

#[async_trait]
impl JobHandler for ExtensionsJob {
    fn kind(&self) -> JobKind {
        JobKind::Extensions
    }

    async fn execute(&self, ctx: &EngineContext, max_depth: Option<i32>) -> JobReport {
        let pass = super::foldmachine(ctx).bottom_up(&ExtensionSet, max_depth).await;
        JobReport::from_pass(self.kind(), pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::{deep, fixture};

    #[tokio::test]
    async fn test_union_reaches_the_root() {
        let fx = fixture(deep());
        let report = ExtensionsJob.execute(&fx.ctx, None).await;
        assert!(report.is_success());

        assert_eq!(fx.nodes.get("aa").expect("aa").files_ext, vec!["db"]);
        assert_eq!(fx.nodes.get("a").expect("a").files_ext, vec!["db", "pdf"]);
        assert_eq!(fx.nodes.get("bb").expect("bb").files_ext, vec!["dwg"]);
        assert_eq!(fx.nodes.get("b").expect("b").files_ext, vec!["dwg"]);
        // readme has no extension and contributes nothing
        assert_eq!(
            fx.nodes.get("r").expect("r").files_ext,
            vec!["db", "dwg", "pdf"]
        );
    }

    #[tokio::test]
    async fn test_stale_sets_are_cleared() {
        let mut nodes = deep();
        if let Some(b) = nodes.iter_mut().find(|n| n.id == "b") {
            b.files_ext = vec!["zip".into()];
        }
        let mut lonely = Node::folder("l", Some("r"), 1, "l");
        lonely.files_ext = vec!["old".into()];
        nodes.push(lonely);

        let fx = fixture(nodes);
        ExtensionsJob.execute(&fx.ctx, None).await;
        assert_eq!(fx.nodes.get("b").expect("b").files_ext, vec!["dwg"]);
        assert!(fx.nodes.get("l").expect("l").files_ext.is_empty());
    }

    #[tokio::test]
    async fn test_idempotent() {
        let fx = fixture(deep());
        let first = ExtensionsJob.execute(&fx.ctx, None).await;
        assert!(first.modified() > 0);
        let second = ExtensionsJob.execute(&fx.ctx, None).await;
        assert_eq!(second.modified(), 0);
    }
}
