//! Keyset cursor over a node store.

use treehub_core::result::AppResult;
use treehub_core::types::PageRequest;
use treehub_entity::Node;

use super::{NodeField, NodeFilter, NodeStore};

/// Pages through every node matching a filter, in id order, without
/// holding more than one page in memory.
#[derive(Debug)]
pub struct NodeCursor<'a> {
    store: &'a dyn NodeStore,
    filter: NodeFilter,
    fields: Vec<NodeField>,
    page: PageRequest,
    exhausted: bool,
    malformed: usize,
}

impl<'a> NodeCursor<'a> {
    /// Open a cursor; nothing is read until the first batch is requested.
    pub fn new(
        store: &'a dyn NodeStore,
        filter: NodeFilter,
        fields: &[NodeField],
        page_size: usize,
    ) -> Self {
        Self {
            store,
            filter,
            fields: fields.to_vec(),
            page: PageRequest::first(page_size),
            exhausted: false,
            malformed: 0,
        }
    }

    /// Fetch the next page, or `None` once the scan is complete.
    pub async fn next_batch(&mut self) -> AppResult<Option<Vec<Node>>> {
        if self.exhausted {
            return Ok(None);
        }

        let found = self
            .store
            .find_page(
                &self.filter,
                &self.fields,
                self.page.after.as_deref(),
                self.page.limit,
            )
            .await?;

        self.malformed += found.malformed;
        match found.last_id {
            Some(last_id) if found.scanned >= self.page.limit => {
                self.page = self.page.next(last_id);
            }
            _ => self.exhausted = true,
        }

        if found.nodes.is_empty() && self.exhausted {
            return Ok(None);
        }
        Ok(Some(found.nodes))
    }

    /// Records skipped as malformed so far.
    pub fn malformed(&self) -> usize {
        self.malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryNodeStore;

    async fn seeded(n: usize) -> MemoryNodeStore {
        let store = MemoryNodeStore::new("files");
        let nodes = (0..n)
            .map(|i| Node::folder(format!("n{i:04}"), None, 0, format!("n{i}")))
            .collect();
        store.insert_many(nodes).await.expect("seed");
        store
    }

    #[tokio::test]
    async fn test_pages_span_the_whole_store() {
        let store = seeded(25).await;
        let mut cursor = NodeCursor::new(&store, NodeFilter::all(), &[NodeField::Name], 10);
        let mut all = Vec::new();
        while let Some(batch) = cursor.next_batch().await.expect("page") {
            all.extend(batch);
        }
        assert_eq!(all.len(), 25);
        assert_eq!(all[0].id, "n0000");
        assert_eq!(all[24].id, "n0024");
    }

    #[tokio::test]
    async fn test_exact_multiple_of_page_size() {
        let store = seeded(20).await;
        let mut cursor = NodeCursor::new(&store, NodeFilter::all(), &[], 10);
        let mut pages = 0;
        while let Some(batch) = cursor.next_batch().await.expect("page") {
            assert_eq!(batch.len(), 10);
            pages += 1;
        }
        assert_eq!(pages, 2);
    }

    #[tokio::test]
    async fn test_short_last_page() {
        let store = seeded(7).await;
        let mut cursor = NodeCursor::new(&store, NodeFilter::all(), &[], 3);
        let mut sizes = Vec::new();
        while let Some(batch) = cursor.next_batch().await.expect("page") {
            sizes.push(batch.len());
        }
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = MemoryNodeStore::new("files");
        let mut cursor = NodeCursor::new(&store, NodeFilter::all(), &[], 10);
        assert!(cursor.next_batch().await.expect("page").is_none());
    }
}
