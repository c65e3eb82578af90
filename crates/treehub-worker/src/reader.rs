//! Level reader: projected, paginated reads of one depth at a time.

use treehub_core::result::AppResult;
use treehub_database::{NodeCursor, NodeField, NodeFilter, NodeStore};
use treehub_entity::Node;

/// Nodes read for one level plus the count of skipped records.
#[derive(Debug, Clone, Default)]
pub struct LevelRead {
    /// Valid projected nodes, in id order.
    pub nodes: Vec<Node>,
    /// Records skipped because they failed validation.
    pub malformed: usize,
}

/// Reads levels of a node store in pages of `page_size`.
#[derive(Debug, Clone, Copy)]
pub struct LevelReader<'a> {
    store: &'a dyn NodeStore,
    page_size: usize,
}

impl<'a> LevelReader<'a> {
    /// Create a reader over `store`.
    pub fn new(store: &'a dyn NodeStore, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    /// Open a streaming cursor for full-collection scans.
    pub fn cursor(&self, filter: NodeFilter, fields: &[NodeField]) -> NodeCursor<'a> {
        NodeCursor::new(self.store, filter, fields, self.page_size)
    }

    /// Every node at `depth`.
    pub async fn read_level(&self, depth: i32, fields: &[NodeField]) -> AppResult<LevelRead> {
        self.read(NodeFilter::at_depth(depth), fields).await
    }

    /// Every node matching `filter`, paged but collected.
    pub async fn read(&self, filter: NodeFilter, fields: &[NodeField]) -> AppResult<LevelRead> {
        let mut cursor = self.cursor(filter, fields);
        let mut read = LevelRead::default();
        while let Some(batch) = cursor.next_batch().await? {
            read.nodes.extend(batch);
        }
        read.malformed = cursor.malformed();
        Ok(read)
    }

    /// Nodes matching `filter` whose id is in `ids`, querying `page_size`
    /// ids at a time.
    pub async fn read_ids(
        &self,
        filter: NodeFilter,
        ids: &[String],
        fields: &[NodeField],
    ) -> AppResult<LevelRead> {
        let mut read = LevelRead::default();
        for chunk in ids.chunks(self.page_size) {
            let filter = NodeFilter {
                ids: Some(chunk.to_vec()),
                ..filter.clone()
            };
            let part = self.read(filter, fields).await?;
            read.nodes.extend(part.nodes);
            read.malformed += part.malformed;
        }
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use treehub_database::MemoryNodeStore;
    use treehub_entity::NodeType;

    use super::*;

    fn store() -> MemoryNodeStore {
        let mut nodes = vec![Node::folder("r", None, 0, "r")];
        for i in 0..7 {
            nodes.push(Node::file(format!("f{i}"), Some("r"), 1, format!("{i}.txt")));
        }
        let mut orphan = Node::folder("x", None, 1, "x");
        orphan.parent_id = None;
        nodes.push(orphan);
        MemoryNodeStore::with_nodes("files", nodes)
    }

    #[tokio::test]
    async fn test_read_level_pages_and_skips_malformed() {
        let store = store();
        let reader = LevelReader::new(&store, 3);
        let read = reader
            .read_level(1, &[NodeField::Ext])
            .await
            .expect("read");
        assert_eq!(read.nodes.len(), 7);
        assert_eq!(read.malformed, 1);
        assert!(read.nodes.iter().all(|n| n.ext.as_deref() == Some("txt")));
    }

    #[tokio::test]
    async fn test_read_ids_in_chunks() {
        let store = store();
        let reader = LevelReader::new(&store, 2);
        let ids: Vec<String> = ["f0", "f3", "f6", "r"].iter().map(|s| s.to_string()).collect();
        let read = reader
            .read_ids(NodeFilter::at_depth(1).of_type(NodeType::File), &ids, &[])
            .await
            .expect("read");
        let found: Vec<&str> = read.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(found, vec!["f0", "f3", "f6"]);
    }
}
