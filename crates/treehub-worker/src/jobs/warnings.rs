//! Flags junk and transient files.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{error, info};

use treehub_core::config::EngineConfig;
use treehub_database::{NodeField, NodeFilter, NodePatch, NodeUpdate};
use treehub_entity::{Node, NodeType};

use crate::context::EngineContext;
use crate::error::PassError;
use crate::executor::{JobHandler, JobKind, JobReport};
use crate::reader::LevelReader;
use crate::writer::BatchWriter;

const FIELDS: [NodeField; 3] = [NodeField::Name, NodeField::Ext, NodeField::IsWarning];

/// Case-insensitive extension and file-name lists.
#[derive(Debug, Clone)]
pub struct WarningRules {
    extensions: HashSet<String>,
    names: HashSet<String>,
}

impl WarningRules {
    /// Rules from the configured lists, lowercased and with leading dots
    /// stripped from extensions.
    pub fn from_config(config: &EngineConfig) -> Self {
        let lower = |v: &[String]| {
            v.iter()
                .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                .collect()
        };
        Self {
            extensions: lower(&config.warning_extensions),
            names: lower(&config.warning_names),
        }
    }

    /// Whether `node` is a junk artifact.
    pub fn is_warning(&self, node: &Node) -> bool {
        node.ext
            .as_deref()
            .is_some_and(|ext| self.extensions.contains(ext))
            || self.names.contains(&node.name.to_lowercase())
    }
}

/// Sets `is_warning` on files matching [`WarningRules`] and clears it
/// elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarningsJob;

impl WarningsJob {
    async fn scan(ctx: &EngineContext, report: &mut JobReport) -> Result<(), PassError> {
        let rules = WarningRules::from_config(&ctx.config);
        let reader = LevelReader::new(ctx.nodes.as_ref(), ctx.config.page_size);
        let mut writer = BatchWriter::new(ctx.nodes.as_ref(), ctx.config.batch_size);
        let mut cursor = reader.cursor(NodeFilter::all().of_type(NodeType::File), &FIELDS);
        let (mut flagged, mut cleared) = (0u64, 0u64);

        while let Some(batch) = cursor.next_batch().await.map_err(PassError::read)? {
            for node in batch {
                let warning = rules.is_warning(&node);
                if warning == node.is_warning {
                    continue;
                }
                if warning {
                    flagged += 1;
                } else {
                    cleared += 1;
                }
                let patch = NodePatch {
                    is_warning: Some(warning),
                    ..NodePatch::default()
                };
                writer.stage(NodeUpdate::new(node.id, patch)).await?;
            }
        }
        writer.flush().await?;

        info!(flagged, cleared, malformed = cursor.malformed(), "Warning flags updated");
        report.total("flagged", flagged);
        report.total("cleared", cleared);
        report.total("malformed", cursor.malformed() as u64);
        Ok(())
    }
}

#[async_trait]
impl JobHandler for WarningsJob {
    fn kind(&self) -> JobKind {
        JobKind::Warnings
    }

    async fn execute(&self, ctx: &EngineContext, _max_depth: Option<i32>) -> JobReport {
        let mut report = JobReport::new(self.kind());
        if let Err(e) = Self::scan(ctx, &mut report).await {
            error!(error = %e, "Warning scan failed");
            report.error = Some(e.to_string());
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::fixture;

    #[test]
    fn test_rules_are_case_insensitive() {
        let rules = WarningRules::from_config(&EngineConfig::default());
        assert!(rules.is_warning(&Node::file("1", None, 0, "THUMBS.DB")));
        assert!(rules.is_warning(&Node::file("2", None, 0, "Shortcut.LNK")));
        assert!(!rules.is_warning(&Node::file("3", None, 0, "plan.dwg")));
    }

    #[test]
    fn test_configured_lists_are_normalized() {
        let config = EngineConfig {
            warning_extensions: vec![" .TMP ".into()],
            warning_names: vec!["Desktop.INI".into()],
            ..EngineConfig::default()
        };
        let rules = WarningRules::from_config(&config);
        assert!(rules.is_warning(&Node::file("1", None, 0, "draft.tmp")));
        assert!(rules.is_warning(&Node::file("2", None, 0, "desktop.ini")));
        assert!(!rules.is_warning(&Node::file("3", None, 0, "Thumbs.db")));
    }

    #[tokio::test]
    async fn test_flags_and_clears() {
        let mut stale = Node::file("f2", Some("r"), 1, "report.pdf");
        stale.is_warning = true;
        let fx = fixture(vec![
            Node::folder("r", None, 0, "r"),
            Node::file("f1", Some("r"), 1, "Thumbs.db"),
            stale,
            Node::file("f3", Some("r"), 1, "half.crdownload"),
            Node::file("f4", Some("r"), 1, "notes.txt"),
        ]);

        let report = WarningsJob.execute(&fx.ctx, None).await;
        assert!(report.is_success());
        assert_eq!(report.get("flagged"), Some(2));
        assert_eq!(report.get("cleared"), Some(1));
        assert!(fx.nodes.get("f1").is_some_and(|n| n.is_warning));
        assert!(fx.nodes.get("f2").is_some_and(|n| !n.is_warning));
        assert!(fx.nodes.get("f4").is_some_and(|n| !n.is_warning));

        let again = WarningsJob.execute(&fx.ctx, None).await;
        assert_eq!(again.get("flagged"), Some(0));
        assert_eq!(again.get("cleared"), Some(0));
    }

    #[tokio::test]
    async fn test_folders_are_ignored() {
        let fx = fixture(vec![Node::folder("t", None, 0, "thumbs.db")]);
        let report = WarningsJob.execute(&fx.ctx, None).await;
        assert_eq!(report.get("flagged"), Some(0));
        assert!(fx.nodes.get("t").is_some_and(|n| !n.is_warning));
    }
}
