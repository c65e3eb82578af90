//! # treehub-database
//!
//! PostgreSQL connection management plus the storage capabilities the
//! propagation engine consumes: the [`NodeStore`] trait over live and
//! staging node tables, the reference dataset, and the run log. Every
//! capability has a PostgreSQL implementation and an in-memory one used
//! by tests.

pub mod connection;
pub mod migration;
pub mod reference;
pub mod run_log;
pub mod store;

pub use connection::DatabasePool;
pub use reference::{MemoryReferenceSource, PgReferenceSource, ReferenceSource};
pub use run_log::{MemoryRunLog, PgRunLog, RunLogStore};
pub use store::{
    MemoryNodeStore, NodeCursor, NodeField, NodeFilter, NodePatch, NodeStore, NodeUpdate,
    PgNodeStore,
};
