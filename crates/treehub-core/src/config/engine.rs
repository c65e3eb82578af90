//! Propagation engine configuration.

use serde::{Deserialize, Serialize};

/// Maximum operations sent in a single bulk request.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Tuning knobs for level passes, bulk writes, and warning rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cap on operations per physical bulk write.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Number of records fetched per read page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Bounded concurrency for independent sibling-subtree work.
    #[serde(default = "default_link_concurrency")]
    pub link_concurrency: usize,
    /// File extensions that mark junk/transient artifacts.
    #[serde(default = "default_warning_extensions")]
    pub warning_extensions: Vec<String>,
    /// File names (case-insensitive) that mark junk artifacts.
    #[serde(default = "default_warning_names")]
    pub warning_names: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            page_size: default_page_size(),
            link_concurrency: default_link_concurrency(),
            warning_extensions: default_warning_extensions(),
            warning_names: default_warning_names(),
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_page_size() -> usize {
    10_000
}

fn default_link_concurrency() -> usize {
    10
}

fn default_warning_extensions() -> Vec<String> {
    vec!["lnk".to_string(), "crdownload".to_string()]
}

fn default_warning_names() -> Vec<String> {
    vec!["thumbs.db".to_string()]
}
