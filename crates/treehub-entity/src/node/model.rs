//! Node entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use treehub_core::error::AppError;

use super::db_ref::DbRef;
use super::kind::NodeType;

/// Longest extension kept on a node; anything longer is not a real extension.
const MAX_EXT_LEN: usize = 10;

/// One file or folder in the materialized tree.
///
/// `id`, `parent_id`, `depth`, `node_type`, `name`, `path`, `ext`, `updated`
/// (for files) and `created` are raw data written by the import/sync stage.
/// `ancestor_ids`, `is_empty`, `files_ext`, `updated` (for folders) and
/// `db_ref` are derived and rewritten in place by the propagation jobs.
///
/// Projected reads leave unrequested fields at their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Stable logical identifier assigned at import.
    pub id: String,
    /// Logical id of the direct parent (`None` for roots).
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Distance from the root (root = 0).
    #[serde(default)]
    pub depth: i32,
    /// File or folder.
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    /// Entry name.
    #[serde(default)]
    pub name: String,
    /// Full source path.
    #[serde(default)]
    pub path: String,
    /// Lower-cased file extension.
    #[serde(default)]
    pub ext: Option<String>,
    /// Ancestor ids from root to direct parent.
    #[serde(default)]
    pub ancestor_ids: Vec<String>,
    /// Folder has no file or non-empty, non-warning folder among its children.
    #[serde(default)]
    pub is_empty: bool,
    /// Junk or transient artifact.
    #[serde(default)]
    pub is_warning: bool,
    /// Sorted set of extensions found anywhere beneath a folder.
    #[serde(default)]
    pub files_ext: Vec<String>,
    /// Last modification time.
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    /// Creation time as reported by the crawler.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    /// File size in bytes.
    #[serde(default)]
    pub size: Option<i64>,
    /// Link into the reference dataset.
    #[serde(default)]
    pub db_ref: Option<DbRef>,
    /// Category ids assigned by the subject matcher.
    #[serde(default)]
    pub subjects: Vec<String>,
    /// Sync bookkeeping flag: seen in the latest staging snapshot.
    #[serde(rename = "isChecked", default)]
    pub checked: bool,
}

impl Node {
    /// A folder node with empty derived state.
    pub fn folder(
        id: impl Into<String>,
        parent_id: Option<&str>,
        depth: i32,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            parent_id: parent_id.map(str::to_string),
            depth,
            node_type: NodeType::Folder,
            path: name.clone(),
            name,
            ..Self::default()
        }
    }

    /// A file node; the extension is derived from the name.
    pub fn file(
        id: impl Into<String>,
        parent_id: Option<&str>,
        depth: i32,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let ext = name.rsplit_once('.').and_then(|(_, ext)| normalize_ext(ext));
        Self {
            id: id.into(),
            parent_id: parent_id.map(str::to_string),
            depth,
            node_type: NodeType::File,
            path: name.clone(),
            name,
            ext,
            ..Self::default()
        }
    }

    /// Set the modification time (builder style).
    pub fn with_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = Some(updated);
        self
    }

    /// Whether this node is a folder.
    pub fn is_folder(&self) -> bool {
        self.node_type == NodeType::Folder
    }

    /// Whether this node is a file.
    pub fn is_file(&self) -> bool {
        self.node_type == NodeType::File
    }

    /// Check the structural preconditions the engine relies on.
    ///
    /// The engine never repairs these; records that fail are skipped.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.id.is_empty() {
            return Err(AppError::malformed("Node has an empty id"));
        }
        if self.depth < 0 {
            return Err(AppError::malformed(format!(
                "Node {} has negative depth {}",
                self.id, self.depth
            )));
        }
        if self.depth > 0 && self.parent_id.as_deref().is_none_or(str::is_empty) {
            return Err(AppError::malformed(format!(
                "Node {} at depth {} has no parentId",
                self.id, self.depth
            )));
        }
        Ok(())
    }
}

/// Normalize a raw extension: strip a leading dot, lower-case it, and drop
/// it when empty or longer than ten characters.
pub fn normalize_ext(raw: &str) -> Option<String> {
    let ext = raw.trim().trim_start_matches('.');
    if ext.is_empty() || ext.chars().count() > MAX_EXT_LEN {
        return None;
    }
    Some(ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension_from_name() {
        assert_eq!(Node::file("1", None, 0, "Report.PDF").ext.as_deref(), Some("pdf"));
        assert_eq!(Node::file("2", None, 0, "Makefile").ext, None);
        assert_eq!(Node::file("3", None, 0, "a.verylongextension").ext, None);
    }

    #[test]
    fn test_validate_missing_parent() {
        let mut node = Node::folder("c", Some("p"), 1, "c");
        assert!(node.validate().is_ok());
        node.parent_id = None;
        let err = node.validate().unwrap_err();
        assert_eq!(err.kind, treehub_core::error::ErrorKind::MalformedSourceRecord);
    }

    #[test]
    fn test_validate_root_without_parent() {
        assert!(Node::folder("r", None, 0, "r").validate().is_ok());
    }

    #[test]
    fn test_json_field_names() {
        let node = Node::folder("a", None, 0, "A");
        let json = serde_json::to_value(&node).expect("serialize");
        assert_eq!(json["type"], "folder");
        assert_eq!(json["ancestorIds"], serde_json::json!([]));
        assert_eq!(json["isChecked"], false);
        assert!(json.get("parentId").is_some());
    }
}
