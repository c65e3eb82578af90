//! CLI command definitions and dispatch.

pub mod config;
pub mod logs;
pub mod migrate;
pub mod run;
pub mod stats;

use clap::{Parser, Subcommand};

use treehub_core::config::AppConfig;
use treehub_core::error::AppError;

use crate::output::OutputFormat;

/// TreeHub: derived-attribute propagation over a materialized file tree
#[derive(Debug, Parser)]
#[command(name = "treehub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (extension optional)
    #[arg(short, long, default_value = "config/default")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run propagation jobs
    Run(run::RunArgs),
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Node table statistics
    Stats,
    /// Recent run log entries
    Logs(logs::LogsArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the command. `Ok(false)` means it ran but reported failures.
    pub async fn execute(&self, config: AppConfig) -> Result<bool, AppError> {
        match &self.command {
            Commands::Run(args) => run::execute(args, &config, self.format).await,
            Commands::Migrate(args) => migrate::execute(args, &config).await.map(|()| true),
            Commands::Stats => stats::execute(&config, self.format).await.map(|()| true),
            Commands::Logs(args) => logs::execute(args, &config, self.format)
                .await
                .map(|()| true),
            Commands::Config(args) => config::execute(args, &config, &self.config, self.format)
                .map(|()| true),
        }
    }
}
