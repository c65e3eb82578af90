//! In-memory node store.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::warn;

use treehub_core::error::AppError;
use treehub_core::result::AppResult;
use treehub_core::types::BulkWriteResult;
use treehub_entity::Node;

use super::field::project;
use super::{FoundPage, NodeField, NodeFilter, NodePatch, NodeStore, NodeUpdate};

/// Sentinel for "no depth is failing".
const NO_DEPTH: i32 = -1;

/// A node table held in a concurrent map.
///
/// Used by tests. Records every bulk request size so callers
/// can observe batching, and can simulate an unreachable store or a
/// rejected bulk write.
#[derive(Debug)]
pub struct MemoryNodeStore {
    collection: String,
    nodes: DashMap<String, Node>,
    bulk_requests: Mutex<Vec<usize>>,
    unavailable_depth: AtomicI32,
    unavailable: AtomicBool,
    reject_writes: AtomicBool,
}

impl MemoryNodeStore {
    /// Create an empty store.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            nodes: DashMap::new(),
            bulk_requests: Mutex::new(Vec::new()),
            unavailable_depth: AtomicI32::new(NO_DEPTH),
            unavailable: AtomicBool::new(false),
            reject_writes: AtomicBool::new(false),
        }
    }

    /// Create a store holding `nodes`.
    pub fn with_nodes(collection: impl Into<String>, nodes: impl IntoIterator<Item = Node>) -> Self {
        let store = Self::new(collection);
        for node in nodes {
            store.nodes.insert(node.id.clone(), node);
        }
        store
    }

    /// Snapshot of one node.
    pub fn get(&self, id: &str) -> Option<Node> {
        self.nodes.get(id).map(|n| n.value().clone())
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sizes of every bulk request received so far.
    pub async fn bulk_request_sizes(&self) -> Vec<usize> {
        self.bulk_requests.lock().await.clone()
    }

    /// Make reads filtered on `depth` fail as if the store were unreachable.
    pub fn fail_reads_at_depth(&self, depth: Option<i32>) {
        self.unavailable_depth
            .store(depth.unwrap_or(NO_DEPTH), Ordering::SeqCst);
    }

    /// Make every operation fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Reject every bulk update outright.
    pub fn reject_bulk_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable(format!(
                "Collection {} is unavailable",
                self.collection
            )));
        }
        Ok(())
    }

    fn check_read(&self, filter: &NodeFilter) -> AppResult<()> {
        self.check_available()?;
        let failing = self.unavailable_depth.load(Ordering::SeqCst);
        if failing != NO_DEPTH && filter.depth == Some(failing) {
            return Err(AppError::store_unavailable(format!(
                "Read of depth {failing} from {} failed",
                self.collection
            )));
        }
        Ok(())
    }

    fn matching_ids(&self, filter: &NodeFilter) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn find_page(
        &self,
        filter: &NodeFilter,
        fields: &[NodeField],
        after: Option<&str>,
        limit: usize,
    ) -> AppResult<FoundPage> {
        self.check_read(filter)?;

        let mut matched: Vec<Node> = self
            .nodes
            .iter()
            .filter(|entry| after.is_none_or(|a| entry.key().as_str() > a))
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        matched.truncate(limit);

        let mut page = FoundPage {
            scanned: matched.len(),
            last_id: matched.last().map(|n| n.id.clone()),
            ..FoundPage::default()
        };
        for node in matched {
            match node.validate() {
                Ok(()) => page.nodes.push(project(&node, fields)),
                Err(e) => {
                    warn!(collection = %self.collection, error = %e, "Skipping malformed node");
                    page.malformed += 1;
                }
            }
        }
        Ok(page)
    }

    async fn bulk_update(&self, updates: Vec<NodeUpdate>) -> AppResult<BulkWriteResult> {
        self.check_available()?;
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(AppError::write_failed(format!(
                "Bulk write of {} operations to {} rejected",
                updates.len(),
                self.collection
            )));
        }
        if let Some(update) = updates.iter().find(|u| u.patch.is_noop()) {
            return Err(AppError::write_failed(format!(
                "Update for node {} sets no fields",
                update.id
            )));
        }

        self.bulk_requests.lock().await.push(updates.len());

        let mut result = BulkWriteResult::default();
        for update in updates {
            if let Some(mut node) = self.nodes.get_mut(&update.id) {
                result.matched += 1;
                if update.patch.apply(node.value_mut()) {
                    result.modified += 1;
                }
            }
        }
        Ok(result)
    }

    async fn count(&self, filter: &NodeFilter) -> AppResult<u64> {
        self.check_read(filter)?;
        Ok(self
            .nodes
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count() as u64)
    }

    async fn existing_ids(&self, ids: &[String]) -> AppResult<Vec<String>> {
        self.check_available()?;
        let mut found: Vec<String> = ids
            .iter()
            .filter(|id| self.nodes.contains_key(id.as_str()))
            .cloned()
            .collect();
        found.sort();
        found.dedup();
        Ok(found)
    }

    async fn max_depth(&self) -> AppResult<Option<i32>> {
        self.check_available()?;
        Ok(self.nodes.iter().map(|entry| entry.value().depth).max())
    }

    async fn insert_many(&self, nodes: Vec<Node>) -> AppResult<u64> {
        self.check_available()?;
        let mut inserted = 0;
        for node in nodes {
            if !self.nodes.contains_key(&node.id) {
                self.nodes.insert(node.id.clone(), node);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn update_many(&self, filter: &NodeFilter, patch: &NodePatch) -> AppResult<u64> {
        self.check_available()?;
        let mut affected = 0;
        for id in self.matching_ids(filter) {
            if let Some(mut node) = self.nodes.get_mut(&id) {
                patch.apply(node.value_mut());
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete_many(&self, filter: &NodeFilter) -> AppResult<u64> {
        self.check_available()?;
        let mut deleted = 0;
        for id in self.matching_ids(filter) {
            if self.nodes.remove(&id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use treehub_core::error::ErrorKind;

    use super::*;

    fn tree() -> MemoryNodeStore {
        MemoryNodeStore::with_nodes(
            "files",
            [
                Node::folder("a", None, 0, "A"),
                Node::file("b", Some("a"), 1, "b.txt"),
                Node::folder("c", Some("a"), 1, "C"),
            ],
        )
    }

    #[tokio::test]
    async fn test_bulk_update_counts_matched_and_modified() {
        let store = tree();
        let patch = NodePatch {
            is_empty: Some(true),
            ..NodePatch::default()
        };
        let updates = vec![
            NodeUpdate::new("c", patch.clone()),
            NodeUpdate::new("missing", patch.clone()),
        ];
        let result = store.bulk_update(updates).await.expect("write");
        assert_eq!(result, BulkWriteResult { matched: 1, modified: 1 });

        let again = store
            .bulk_update(vec![NodeUpdate::new("c", patch)])
            .await
            .expect("write");
        assert_eq!(again, BulkWriteResult { matched: 1, modified: 0 });
        assert_eq!(store.bulk_request_sizes().await, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_empty_patch_rejects_request() {
        let store = tree();
        let err = store
            .bulk_update(vec![NodeUpdate::new("a", NodePatch::default())])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::WriteFailed);
        assert!(store.bulk_request_sizes().await.is_empty());
    }

    #[tokio::test]
    async fn test_existing_ids_include_malformed_records() {
        let store = tree();
        store.insert_many(vec![Node::folder("d", None, 1, "D")]).await.expect("insert");
        let ids: Vec<String> = ["d", "a", "zz"].iter().map(|s| s.to_string()).collect();
        assert_eq!(store.existing_ids(&ids).await.expect("ids"), vec!["a", "d"]);
    }

    #[tokio::test]
    async fn test_max_depth() {
        assert_eq!(tree().max_depth().await.expect("depth"), Some(1));
        let empty = MemoryNodeStore::new("files");
        assert_eq!(empty.max_depth().await.expect("depth"), None);
    }

    #[tokio::test]
    async fn test_malformed_nodes_are_skipped() {
        let mut orphan = Node::folder("d", None, 1, "D");
        orphan.parent_id = None;
        let store = tree();
        store.insert_many(vec![orphan]).await.expect("insert");

        let page = store
            .find_page(&NodeFilter::at_depth(1), &[], None, 10)
            .await
            .expect("page");
        assert_eq!(page.scanned, 3);
        assert_eq!(page.malformed, 1);
        assert_eq!(page.nodes.len(), 2);
        assert_eq!(page.last_id.as_deref(), Some("d"));
    }

    #[tokio::test]
    async fn test_failing_depth() {
        let store = tree();
        store.fail_reads_at_depth(Some(1));
        let err = store
            .find_page(&NodeFilter::at_depth(1), &[], None, 10)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::StoreUnavailable);
        assert!(store
            .find_page(&NodeFilter::at_depth(0), &[], None, 10)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_rejected_write() {
        let store = tree();
        store.reject_bulk_writes(true);
        let err = store
            .bulk_update(vec![NodeUpdate::new(
                "a",
                NodePatch {
                    is_empty: Some(false),
                    ..NodePatch::default()
                },
            )])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::WriteFailed);
        assert!(!store.get("a").is_some_and(|n| n.is_empty));
    }

    #[tokio::test]
    async fn test_insert_ignores_existing_and_delete_by_filter() {
        let store = tree();
        let inserted = store
            .insert_many(vec![
                Node::folder("a", None, 0, "dup"),
                Node::folder("z", None, 0, "Z"),
            ])
            .await
            .expect("insert");
        assert_eq!(inserted, 1);
        assert_eq!(store.get("a").map(|n| n.name), Some("A".to_string()));

        let deleted = store
            .delete_many(&NodeFilter::at_depth(0))
            .await
            .expect("delete");
        assert_eq!(deleted, 2);
        assert_eq!(store.len(), 2);
    }
}
