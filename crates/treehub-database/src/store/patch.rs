//! Point updates against derived node fields.

use chrono::{DateTime, Utc};

use treehub_entity::{DbRef, Node};

use super::field::NodeField;

/// The set of derived fields an update writes. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    /// New ancestor chain.
    pub ancestor_ids: Option<Vec<String>>,
    /// New emptiness flag.
    pub is_empty: Option<bool>,
    /// New warning flag.
    pub is_warning: Option<bool>,
    /// New aggregated extension set.
    pub files_ext: Option<Vec<String>>,
    /// New modification time.
    pub updated: Option<DateTime<Utc>>,
    /// New reference link.
    pub db_ref: Option<DbRef>,
    /// New subject list.
    pub subjects: Option<Vec<String>>,
    /// New sync seen-flag.
    pub checked: Option<bool>,
}

impl NodePatch {
    /// Whether the patch sets nothing.
    pub fn is_noop(&self) -> bool {
        self.fields().is_empty()
    }

    /// Fields this patch sets, in column order.
    pub fn fields(&self) -> Vec<NodeField> {
        let mut fields = Vec::new();
        if self.ancestor_ids.is_some() {
            fields.push(NodeField::AncestorIds);
        }
        if self.is_empty.is_some() {
            fields.push(NodeField::IsEmpty);
        }
        if self.is_warning.is_some() {
            fields.push(NodeField::IsWarning);
        }
        if self.files_ext.is_some() {
            fields.push(NodeField::FilesExt);
        }
        if self.updated.is_some() {
            fields.push(NodeField::Updated);
        }
        if self.db_ref.is_some() {
            fields.push(NodeField::DbRef);
        }
        if self.subjects.is_some() {
            fields.push(NodeField::Subjects);
        }
        if self.checked.is_some() {
            fields.push(NodeField::Checked);
        }
        fields
    }

    /// Apply to `node`, returning whether any stored value changed.
    pub fn apply(&self, node: &mut Node) -> bool {
        let mut changed = false;
        changed |= set(&mut node.ancestor_ids, &self.ancestor_ids);
        changed |= set(&mut node.is_empty, &self.is_empty);
        changed |= set(&mut node.is_warning, &self.is_warning);
        changed |= set(&mut node.files_ext, &self.files_ext);
        if let Some(updated) = self.updated
            && node.updated != Some(updated)
        {
            node.updated = Some(updated);
            changed = true;
        }
        if let Some(db_ref) = &self.db_ref
            && node.db_ref.as_ref() != Some(db_ref)
        {
            node.db_ref = Some(db_ref.clone());
            changed = true;
        }
        changed |= set(&mut node.subjects, &self.subjects);
        changed |= set(&mut node.checked, &self.checked);
        changed
    }
}

fn set<T: PartialEq + Clone>(slot: &mut T, value: &Option<T>) -> bool {
    match value {
        Some(v) if slot != v => {
            *slot = v.clone();
            true
        }
        _ => false,
    }
}

/// One point update: the node with logical id `id` gets `patch`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeUpdate {
    /// Target logical id.
    pub id: String,
    /// Fields to set.
    pub patch: NodePatch,
}

impl NodeUpdate {
    /// Create a point update.
    pub fn new(id: impl Into<String>, patch: NodePatch) -> Self {
        Self {
            id: id.into(),
            patch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_reports_change() {
        let mut node = Node::folder("a", None, 0, "a");
        let patch = NodePatch {
            is_empty: Some(true),
            ..NodePatch::default()
        };
        assert!(patch.apply(&mut node));
        assert!(node.is_empty);
        assert!(!patch.apply(&mut node));
    }

    #[test]
    fn test_fields_in_column_order() {
        let patch = NodePatch {
            checked: Some(true),
            files_ext: Some(vec![]),
            ..NodePatch::default()
        };
        assert_eq!(patch.fields(), vec![NodeField::FilesExt, NodeField::Checked]);
        assert!(NodePatch::default().is_noop());
    }
}
