//! Errors raised while processing one level of a pass.

use treehub_core::error::AppError;
use treehub_core::types::WriteProgress;

/// Why a level did not complete.
///
/// Neither variant aborts a multi-level pass: the driver records the
/// failure in the level report and moves on to the next level.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    /// The store could not be reached. A failed read abandons the level
    /// before any write; a connection lost mid-write keeps what was
    /// already flushed.
    #[error("Store unavailable after {} ops in {} requests: {source}", .progress.staged, .progress.requests)]
    StoreUnavailable {
        /// Work already committed when the store went away.
        progress: WriteProgress,
        /// The store's error.
        #[source]
        source: AppError,
    },

    /// A bulk write was rejected; earlier flushes of the level stay applied.
    #[error("Bulk write failed after {} ops in {} requests: {source}", .progress.staged, .progress.requests)]
    WriteFailed {
        /// Work already committed when the write failed.
        progress: WriteProgress,
        /// The store's error.
        #[source]
        source: AppError,
    },
}

impl PassError {
    /// Wrap a failed read.
    pub fn read(source: AppError) -> Self {
        Self::StoreUnavailable {
            progress: WriteProgress::default(),
            source,
        }
    }

    /// Wrap a failed write with the progress made before it.
    pub fn write(progress: WriteProgress, source: AppError) -> Self {
        if source.is_unavailable() {
            Self::StoreUnavailable { progress, source }
        } else {
            Self::WriteFailed { progress, source }
        }
    }

    /// Progress committed before the failure.
    pub fn progress(&self) -> WriteProgress {
        match self {
            Self::StoreUnavailable { progress, .. } | Self::WriteFailed { progress, .. } => {
                *progress
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_store_on_write_is_unavailable() {
        let err = PassError::write(
            WriteProgress::default(),
            AppError::store_unavailable("pool closed"),
        );
        assert!(matches!(err, PassError::StoreUnavailable { .. }));
    }

    #[test]
    fn test_connection_lost_mid_level_keeps_progress() {
        let progress = WriteProgress {
            staged: 20,
            requests: 2,
            matched: 20,
            modified: 20,
        };
        let err = PassError::write(progress, AppError::store_unavailable("connection reset"));
        assert!(matches!(err, PassError::StoreUnavailable { .. }));
        assert_eq!(err.progress(), progress);
    }

    #[test]
    fn test_failed_read_has_no_progress() {
        let err = PassError::read(AppError::store_unavailable("refused"));
        assert_eq!(err.progress(), WriteProgress::default());
    }

    #[test]
    fn test_write_failed_keeps_progress() {
        let progress = WriteProgress {
            staged: 10,
            requests: 1,
            matched: 10,
            modified: 4,
        };
        let err = PassError::write(progress, AppError::write_failed("bad op"));
        assert_eq!(err.progress(), progress);
        assert!(err.to_string().contains("10 ops in 1 requests"));
    }
}
