//! Node filters.

use treehub_entity::{Node, NodeType};

/// Conjunction of optional predicates over a node table.
///
/// An all-`None` filter matches every node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    /// Exact depth.
    pub depth: Option<i32>,
    /// File or folder.
    pub node_type: Option<NodeType>,
    /// Logical id is one of these.
    pub ids: Option<Vec<String>>,
    /// Parent id is one of these.
    pub parent_ids: Option<Vec<String>>,
    /// Ancestor chain contains this id.
    pub ancestor_id: Option<String>,
    /// Emptiness flag equals this.
    pub is_empty: Option<bool>,
    /// Sync seen-flag equals this.
    pub checked: Option<bool>,
}

impl NodeFilter {
    /// Match every node.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match nodes at one depth.
    pub fn at_depth(depth: i32) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    /// Match the given ids.
    pub fn by_ids(ids: Vec<String>) -> Self {
        Self {
            ids: Some(ids),
            ..Self::default()
        }
    }

    /// Restrict to one node type.
    pub fn of_type(mut self, node_type: NodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }

    /// Restrict to children of the given parents.
    pub fn with_parents(mut self, parent_ids: Vec<String>) -> Self {
        self.parent_ids = Some(parent_ids);
        self
    }

    /// Restrict to descendants of `ancestor_id`.
    pub fn under(mut self, ancestor_id: impl Into<String>) -> Self {
        self.ancestor_id = Some(ancestor_id.into());
        self
    }

    /// Restrict on the emptiness flag.
    pub fn with_empty(mut self, is_empty: bool) -> Self {
        self.is_empty = Some(is_empty);
        self
    }

    /// Restrict on the sync seen-flag.
    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    /// Whether `node` satisfies every predicate.
    pub fn matches(&self, node: &Node) -> bool {
        if self.depth.is_some_and(|d| d != node.depth) {
            return false;
        }
        if self.node_type.is_some_and(|t| t != node.node_type) {
            return false;
        }
        if let Some(ids) = &self.ids
            && !ids.contains(&node.id)
        {
            return false;
        }
        if let Some(parents) = &self.parent_ids {
            match &node.parent_id {
                Some(parent) if parents.contains(parent) => {}
                _ => return false,
            }
        }
        if let Some(ancestor) = &self.ancestor_id
            && !node.ancestor_ids.contains(ancestor)
        {
            return false;
        }
        if self.is_empty.is_some_and(|e| e != node.is_empty) {
            return false;
        }
        if self.checked.is_some_and(|c| c != node.checked) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(NodeFilter::all().matches(&Node::folder("a", None, 0, "a")));
    }

    #[test]
    fn test_conjunction() {
        let mut node = Node::file("f", Some("p"), 2, "x.txt");
        node.ancestor_ids = vec!["r".into(), "p".into()];

        let filter = NodeFilter::at_depth(2)
            .of_type(NodeType::File)
            .with_parents(vec!["p".into()])
            .under("r");
        assert!(filter.matches(&node));

        assert!(!NodeFilter::at_depth(1).matches(&node));
        assert!(!NodeFilter::all().of_type(NodeType::Folder).matches(&node));
        assert!(!NodeFilter::all().under("zzz").matches(&node));
        assert!(!NodeFilter::by_ids(vec!["g".into()]).matches(&node));
        assert!(!NodeFilter::all().with_checked(true).matches(&node));
        assert!(!NodeFilter::all().with_empty(true).matches(&node));
    }

    #[test]
    fn test_parent_filter_rejects_roots() {
        let root = Node::folder("r", None, 0, "r");
        assert!(!NodeFilter::all().with_parents(vec!["r".into()]).matches(&root));
    }
}
