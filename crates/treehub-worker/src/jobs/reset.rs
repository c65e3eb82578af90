//! Clears derived state that later jobs recompute from scratch.

use async_trait::async_trait;
use tracing::{error, info};

use treehub_database::{NodeFilter, NodePatch};

use crate::context::EngineContext;
use crate::executor::{JobHandler, JobKind, JobReport};

/// Resets `is_empty` and `subjects` on every live node.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetJob;

fn reset_patch() -> NodePatch {
    NodePatch {
        is_empty: Some(false),
        subjects: Some(Vec::new()),
        ..NodePatch::default()
    }
}

#[async_trait]
impl JobHandler for ResetJob {
    fn kind(&self) -> JobKind {
        JobKind::Reset
    }

    async fn execute(&self, ctx: &EngineContext, _max_depth: Option<i32>) -> JobReport {
        match ctx.nodes.update_many(&NodeFilter::all(), &reset_patch()).await {
            Ok(affected) => {
                info!(affected, "Derived flags reset");
                let mut report = JobReport::new(self.kind());
                report.total("reset", affected);
                report
            }
            Err(e) => {
                error!(error = %e, "Reset failed");
                JobReport::failed(self.kind(), e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::{abc, fixture};

    #[tokio::test]
    async fn test_reset_clears_flags() {
        let mut nodes = abc();
        nodes[2].is_empty = true;
        nodes[1].subjects = vec!["geology".to_string()];
        let fx = fixture(nodes);

        let report = ResetJob.execute(&fx.ctx, None).await;
        assert!(report.is_success());
        assert_eq!(report.get("reset"), Some(3));
        assert!(fx.nodes.get("C").is_some_and(|n| !n.is_empty));
        assert!(fx.nodes.get("B").is_some_and(|n| n.subjects.is_empty()));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let fx = fixture(abc());
        fx.nodes.set_unavailable(true);
        let report = ResetJob.execute(&fx.ctx, None).await;
        assert!(!report.is_success());
    }
}
