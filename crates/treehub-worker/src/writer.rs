//! Batch writer: bounded, unordered bulk point-updates.

use tracing::debug;

use treehub_core::types::{BulkWriteResult, WriteProgress};
use treehub_database::{NodeStore, NodeUpdate};

use crate::error::PassError;

/// Accumulates point updates and sends them in bulk requests of at most
/// `cap` operations.
#[derive(Debug)]
pub struct BatchWriter<'a> {
    store: &'a dyn NodeStore,
    cap: usize,
    pending: Vec<NodeUpdate>,
    progress: WriteProgress,
}

impl<'a> BatchWriter<'a> {
    /// Create a writer that sends at most `cap` operations per request.
    pub fn new(store: &'a dyn NodeStore, cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            store,
            cap,
            pending: Vec::with_capacity(cap.min(4096)),
            progress: WriteProgress::default(),
        }
    }

    /// Queue an update, flushing first if the buffer is full.
    pub async fn stage(&mut self, update: NodeUpdate) -> Result<(), PassError> {
        self.pending.push(update);
        if self.pending.len() >= self.cap {
            self.flush().await?;
        }
        Ok(())
    }

    /// Queue several updates.
    pub async fn stage_all(
        &mut self,
        updates: impl IntoIterator<Item = NodeUpdate>,
    ) -> Result<(), PassError> {
        for update in updates {
            self.stage(update).await?;
        }
        Ok(())
    }

    /// Send everything pending. On failure the unsent operations are dropped
    /// and the error carries what was committed before.
    pub async fn flush(&mut self) -> Result<BulkWriteResult, PassError> {
        let mut total = BulkWriteResult::default();
        while !self.pending.is_empty() {
            let take = self.pending.len().min(self.cap);
            let batch: Vec<NodeUpdate> = self.pending.drain(..take).collect();

            match self.store.bulk_update(batch).await {
                Ok(result) => {
                    self.progress.record(take, result);
                    total += result;
                    debug!(
                        collection = self.store.collection(),
                        ops = take,
                        matched = result.matched,
                        modified = result.modified,
                        "Bulk request sent"
                    );
                }
                Err(e) => {
                    self.pending.clear();
                    return Err(PassError::write(self.progress, e));
                }
            }
        }
        Ok(total)
    }

    /// Operations waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Totals across every successful flush.
    pub fn progress(&self) -> WriteProgress {
        self.progress
    }
}
