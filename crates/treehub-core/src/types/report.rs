//! Write accounting shared by stores and the batch writer.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Result of one physical bulk update request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkWriteResult {
    /// Records matched by an operation's filter.
    pub matched: u64,
    /// Records whose stored value actually changed.
    pub modified: u64,
}

impl AddAssign for BulkWriteResult {
    fn add_assign(&mut self, rhs: Self) {
        self.matched += rhs.matched;
        self.modified += rhs.modified;
    }
}

/// Cumulative progress of a batch writer across flushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteProgress {
    /// Operations handed to the store.
    pub staged: u64,
    /// Physical bulk requests issued.
    pub requests: u64,
    /// Records matched.
    pub matched: u64,
    /// Records modified.
    pub modified: u64,
}

impl WriteProgress {
    /// Fold one successful bulk request of `ops` operations into the totals.
    pub fn record(&mut self, ops: usize, result: BulkWriteResult) {
        self.staged += ops as u64;
        self.requests += 1;
        self.matched += result.matched;
        self.modified += result.modified;
    }
}

impl AddAssign for WriteProgress {
    fn add_assign(&mut self, rhs: Self) {
        self.staged += rhs.staged;
        self.requests += rhs.requests;
        self.matched += rhs.matched;
        self.modified += rhs.modified;
    }
}
