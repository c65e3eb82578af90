//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use treehub_core::config::AppConfig;
use treehub_core::error::AppError;
use treehub_database::connection::mask_password;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

/// Execute config commands. Loading already validated the file.
pub fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut shown = config.clone();
            shown.database.url = mask_password(&shown.database.url);
            if shown.notifications.webhook_url.is_some() {
                shown.notifications.webhook_url = Some("****".to_string());
            }
            match format {
                OutputFormat::Json => output::print_json(&shown),
                OutputFormat::Table => {
                    output::print_kv("Database", &shown.database.url);
                    output::print_kv("Nodes table", &shown.collections.nodes);
                    output::print_kv("Staging table", &shown.collections.staging);
                    output::print_kv("Run log table", &shown.collections.run_log);
                    output::print_kv("Batch size", &shown.engine.batch_size.to_string());
                    output::print_kv("Page size", &shown.engine.page_size.to_string());
                    output::print_kv(
                        "Link concurrency",
                        &shown.engine.link_concurrency.to_string(),
                    );
                    output::print_kv(
                        "Warning extensions",
                        &shown.engine.warning_extensions.join(", "),
                    );
                    output::print_kv("Warning names", &shown.engine.warning_names.join(", "));
                    output::print_kv(
                        "Webhook",
                        if shown.notifications.webhook_url.is_some() {
                            "configured"
                        } else {
                            "disabled"
                        },
                    );
                    output::print_kv("Log level", &shown.logging.level);
                }
            }
        }
        ConfigCommand::Validate => {
            output::print_success(&format!("Configuration '{config_path}' is valid"));
        }
    }

    Ok(())
}
