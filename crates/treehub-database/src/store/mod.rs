//! The node store capability.
//!
//! The engine only ever talks to a table of nodes through [`NodeStore`]:
//! projected keyset-paginated reads, unordered bulk point-updates, and
//! counts. The sync stage additionally inserts and deletes.

pub mod cursor;
pub mod field;
pub mod filter;
pub mod memory;
pub mod patch;
pub mod postgres;

use async_trait::async_trait;

use treehub_core::result::AppResult;
use treehub_core::types::BulkWriteResult;
use treehub_entity::Node;

pub use cursor::NodeCursor;
pub use field::NodeField;
pub use filter::NodeFilter;
pub use memory::MemoryNodeStore;
pub use patch::{NodePatch, NodeUpdate};
pub use postgres::PgNodeStore;

/// Narrow query and bulk-update capability over one node table.
///
/// Implementations exist for PostgreSQL ([`PgNodeStore`]) and for an
/// in-process map ([`MemoryNodeStore`]).
#[async_trait]
pub trait NodeStore: Send + Sync + std::fmt::Debug + 'static {
    /// Name of the underlying table, for logging.
    fn collection(&self) -> &str;

    /// Fetch up to `limit` nodes matching `filter` with `id > after`,
    /// ordered by logical id.
    ///
    /// Only the requested `fields` are populated (the id always is); an
    /// empty slice means every field. Records that fail structural
    /// validation are skipped and logged, so a page may hold fewer than
    /// `limit` records even when more follow. Callers detect the end of a
    /// scan from the raw page size reported by [`NodeCursor`].
    async fn find_page(
        &self,
        filter: &NodeFilter,
        fields: &[NodeField],
        after: Option<&str>,
        limit: usize,
    ) -> AppResult<FoundPage>;

    /// Apply point updates as one unordered bulk request.
    ///
    /// `modified` counts only records whose stored value changed.
    async fn bulk_update(&self, updates: Vec<NodeUpdate>) -> AppResult<BulkWriteResult>;

    /// Count nodes matching `filter`.
    async fn count(&self, filter: &NodeFilter) -> AppResult<u64>;

    /// Which of `ids` are stored, valid or not, in id order.
    ///
    /// Unlike [`find_page`](Self::find_page) this never skips malformed
    /// records, so it tells "absent" apart from "present but unreadable".
    async fn existing_ids(&self, ids: &[String]) -> AppResult<Vec<String>>;

    /// Largest depth present, or `None` when the table is empty.
    async fn max_depth(&self) -> AppResult<Option<i32>>;

    /// Insert nodes, ignoring ids that already exist. Returns the number inserted.
    async fn insert_many(&self, nodes: Vec<Node>) -> AppResult<u64>;

    /// Set the same fields on every node matching `filter`.
    async fn update_many(&self, filter: &NodeFilter, patch: &NodePatch) -> AppResult<u64>;

    /// Delete every node matching `filter`.
    async fn delete_many(&self, filter: &NodeFilter) -> AppResult<u64>;
}

/// One page returned by [`NodeStore::find_page`].
#[derive(Debug, Clone, Default)]
pub struct FoundPage {
    /// Valid records in id order.
    pub nodes: Vec<Node>,
    /// Records scanned, including skipped malformed ones.
    pub scanned: usize,
    /// Largest id scanned; the keyset position for the next page.
    pub last_id: Option<String>,
    /// Records skipped because they failed validation.
    pub malformed: usize,
}
