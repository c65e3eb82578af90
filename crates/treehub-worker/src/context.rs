//! Shared engine dependencies.

use std::sync::Arc;

use treehub_core::config::EngineConfig;
use treehub_database::{NodeStore, ReferenceSource};

/// Stores and settings every job runs against.
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// Live node table.
    pub nodes: Arc<dyn NodeStore>,
    /// Staging table filled by the importer.
    pub staging: Arc<dyn NodeStore>,
    /// Reference dataset for linking.
    pub references: Arc<dyn ReferenceSource>,
    /// Engine settings.
    pub config: EngineConfig,
}

impl EngineContext {
    /// Bundle stores and settings.
    pub fn new(
        nodes: Arc<dyn NodeStore>,
        staging: Arc<dyn NodeStore>,
        references: Arc<dyn ReferenceSource>,
        config: EngineConfig,
    ) -> Self {
        Self {
            nodes,
            staging,
            references,
            config,
        }
    }
}
