//! Ancestor chains, propagated root to leaf.

use async_trait::async_trait;

use treehub_database::{NodeField, NodePatch};
use treehub_entity::Node;

use crate::context::EngineContext;
use crate::executor::{JobHandler, JobKind, JobReport};
use crate::fold::TopDownRule;

/// `ancestorIds[child] = ancestorIds[parent] + [parent.id]`; roots get `[]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AncestorChain;

fn chain_patch(chain: Vec<String>) -> NodePatch {
    NodePatch {
        ancestor_ids: Some(chain),
        ..NodePatch::default()
    }
}

impl TopDownRule for AncestorChain {
    fn name(&self) -> &'static str {
        "ancestors"
    }

    fn parent_fields(&self) -> &'static [NodeField] {
        &[NodeField::AncestorIds]
    }

    fn child_fields(&self) -> &'static [NodeField] {
        &[NodeField::AncestorIds]
    }

    fn root_patch(&self, root: &Node) -> Option<NodePatch> {
        (!root.ancestor_ids.is_empty()).then(|| chain_patch(Vec::new()))
    }

    fn patch(&self, parent: &Node, child: &Node) -> Option<NodePatch> {
        let expected_len = parent.ancestor_ids.len() + 1;
        let matches = child.ancestor_ids.len() == expected_len
            && child.ancestor_ids[..expected_len - 1] == parent.ancestor_ids[..]
            && child.ancestor_ids[expected_len - 1] == parent.id;
        if matches {
            return None;
        }
        let mut chain = Vec::with_capacity(expected_len);
        chain.extend(parent.ancestor_ids.iter().cloned());
        chain.push(parent.id.clone());
        Some(chain_patch(chain))
    }
}

/// Rebuilds every ancestor chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct AncestorsJob;

#[async_trait]
impl JobHandler for AncestorsJob {
    fn kind(&self) -> JobKind {
        JobKind::Ancestors
    }

    async fn execute(&self, ctx: &EngineContext, max_depth: Option<i32>) -> JobReport {
        let pass = super::foldmachine(ctx)
            .top_down(&AncestorChain, max_depth)
            .await;
        JobReport::from_pass(self.kind(), pass)
    }
}
