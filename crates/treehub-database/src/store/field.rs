//! Field projection for node reads.

use std::fmt;

use treehub_entity::Node;

/// A projectable node field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeField {
    /// Logical id (always returned).
    Id,
    /// Direct parent id.
    ParentId,
    /// Depth from the root.
    Depth,
    /// File or folder.
    Type,
    /// Entry name.
    Name,
    /// Full path.
    Path,
    /// File extension.
    Ext,
    /// Ancestor chain.
    AncestorIds,
    /// Folder emptiness.
    IsEmpty,
    /// Junk-artifact flag.
    IsWarning,
    /// Aggregated extension set.
    FilesExt,
    /// Last modification time.
    Updated,
    /// Creation time.
    Created,
    /// Size in bytes.
    Size,
    /// Reference-dataset link.
    DbRef,
    /// Subject categories.
    Subjects,
    /// Sync seen-flag.
    Checked,
}

impl NodeField {
    /// Every field, in column order.
    pub const ALL: [NodeField; 17] = [
        Self::Id,
        Self::ParentId,
        Self::Depth,
        Self::Type,
        Self::Name,
        Self::Path,
        Self::Ext,
        Self::AncestorIds,
        Self::IsEmpty,
        Self::IsWarning,
        Self::FilesExt,
        Self::Updated,
        Self::Created,
        Self::Size,
        Self::DbRef,
        Self::Subjects,
        Self::Checked,
    ];

    /// SQL column name.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ParentId => "parent_id",
            Self::Depth => "depth",
            Self::Type => "type",
            Self::Name => "name",
            Self::Path => "path",
            Self::Ext => "ext",
            Self::AncestorIds => "ancestor_ids",
            Self::IsEmpty => "is_empty",
            Self::IsWarning => "is_warning",
            Self::FilesExt => "files_ext",
            Self::Updated => "updated",
            Self::Created => "created",
            Self::Size => "size",
            Self::DbRef => "db_ref",
            Self::Subjects => "subjects",
            Self::Checked => "is_checked",
        }
    }

    /// Copy this field from `from` into `to`.
    fn copy(&self, from: &Node, to: &mut Node) {
        match self {
            Self::Id => to.id.clone_from(&from.id),
            Self::ParentId => to.parent_id.clone_from(&from.parent_id),
            Self::Depth => to.depth = from.depth,
            Self::Type => to.node_type = from.node_type,
            Self::Name => to.name.clone_from(&from.name),
            Self::Path => to.path.clone_from(&from.path),
            Self::Ext => to.ext.clone_from(&from.ext),
            Self::AncestorIds => to.ancestor_ids.clone_from(&from.ancestor_ids),
            Self::IsEmpty => to.is_empty = from.is_empty,
            Self::IsWarning => to.is_warning = from.is_warning,
            Self::FilesExt => to.files_ext.clone_from(&from.files_ext),
            Self::Updated => to.updated = from.updated,
            Self::Created => to.created = from.created,
            Self::Size => to.size = from.size,
            Self::DbRef => to.db_ref.clone_from(&from.db_ref),
            Self::Subjects => to.subjects.clone_from(&from.subjects),
            Self::Checked => to.checked = from.checked,
        }
    }
}

impl fmt::Display for NodeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Columns to select for a projection. `Id`, `Depth`, `ParentId` and
/// `Type` are always included so rows can be validated.
pub fn projected_columns(fields: &[NodeField]) -> Vec<NodeField> {
    if fields.is_empty() {
        return NodeField::ALL.to_vec();
    }
    let mut columns = vec![
        NodeField::Id,
        NodeField::ParentId,
        NodeField::Depth,
        NodeField::Type,
    ];
    columns.extend(fields.iter().copied());
    columns.sort();
    columns.dedup();
    columns
}

/// Build a copy of `node` holding only the projected fields.
pub fn project(node: &Node, fields: &[NodeField]) -> Node {
    if fields.is_empty() {
        return node.clone();
    }
    let mut projected = Node::default();
    for field in projected_columns(fields) {
        field.copy(node, &mut projected);
    }
    projected
}
