//! Keyset pagination for streaming reads.
//!
//! Level reads and full-collection scans page through records ordered by
//! logical id, resuming strictly after the last id seen. Unlike offset
//! paging this stays stable while the same table is being updated.

use serde::{Deserialize, Serialize};

/// Default page size.
pub const DEFAULT_PAGE_SIZE: usize = 10_000;

/// Request parameters for one page of a keyset scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Resume strictly after this logical id (`None` = from the start).
    pub after: Option<String>,
    /// Maximum number of records in the page.
    pub limit: usize,
}

impl PageRequest {
    /// First page with the given size.
    pub fn first(limit: usize) -> Self {
        Self {
            after: None,
            limit: limit.max(1),
        }
    }

    /// The page following one that ended at `last_id`.
    pub fn next(&self, last_id: impl Into<String>) -> Self {
        Self {
            after: Some(last_id.into()),
            limit: self.limit,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limit_clamped() {
        assert_eq!(PageRequest::first(0).limit, 1);
    }

    #[test]
    fn test_next_keeps_limit() {
        let page = PageRequest::first(50).next("abc");
        assert_eq!(page.after.as_deref(), Some("abc"));
        assert_eq!(page.limit, 50);
    }
}
