//! Core type definitions used across the TreeHub workspace.

pub mod pagination;
pub mod report;

pub use pagination::PageRequest;
pub use report::{BulkWriteResult, WriteProgress};
