//! Node table statistics.

use serde::Serialize;
use tabled::Tabled;

use treehub_core::config::AppConfig;
use treehub_core::error::AppError;
use treehub_database::{NodeFilter, NodeStore};
use treehub_entity::NodeType;

use crate::engine;
use crate::output::{self, OutputFormat};

/// One counter
#[derive(Debug, Serialize, Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl StatRow {
    fn new(metric: &'static str, value: impl ToString) -> Self {
        Self {
            metric,
            value: value.to_string(),
        }
    }
}

/// Print node counts for the live and staging tables.
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let pool = engine::connect(config).await?;
    let ctx = engine::context(config, &pool)?;
    let live = ctx.nodes.as_ref();

    let rows = vec![
        StatRow::new("nodes", live.count(&NodeFilter::all()).await?),
        StatRow::new(
            "folders",
            live.count(&NodeFilter::all().of_type(NodeType::Folder)).await?,
        ),
        StatRow::new(
            "files",
            live.count(&NodeFilter::all().of_type(NodeType::File)).await?,
        ),
        StatRow::new(
            "empty_folders",
            live.count(&NodeFilter::all().with_empty(true)).await?,
        ),
        StatRow::new("max_depth", output::or_dash(live.max_depth().await?)),
        StatRow::new("staging_nodes", ctx.staging.count(&NodeFilter::all()).await?),
    ];
    pool.close().await;

    output::print_list(&rows, format);
    Ok(())
}
