//! TreeHub CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use treehub_core::config::{AppConfig, LoggingConfig};

mod commands;
mod engine;
mod output;

use commands::Cli;

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&format!("Failed to load config '{}': {}", cli.config, e));
            std::process::exit(2);
        }
    };
    init_tracing(&config.logging);

    match cli.execute(config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            output::print_error(&e.to_string());
            std::process::exit(1);
        }
    }
}
