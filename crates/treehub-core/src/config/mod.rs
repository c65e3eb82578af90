//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod collections;
pub mod database;
pub mod engine;
pub mod logging;
pub mod notifications;

use serde::{Deserialize, Serialize};

pub use self::collections::CollectionsConfig;
pub use self::database::DatabaseConfig;
pub use self::engine::EngineConfig;
pub use self::logging::LoggingConfig;
pub use self::notifications::NotificationsConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration (base file + environment overlay + `TREEHUB__*`
/// variables). Every section has defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Table names.
    #[serde(default)]
    pub collections: CollectionsConfig,
    /// Level-pass and bulk-write settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Run notification settings.
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// The base file is optional. If `TREEHUB_ENV` is set, `config/{env}.toml`
    /// is layered on top, followed by environment variables prefixed with
    /// `TREEHUB__` (e.g. `TREEHUB__DATABASE__URL`).
    pub fn load(path: &str) -> Result<Self, AppError> {
        let mut builder =
            config::Config::builder().add_source(config::File::with_name(path).required(false));

        if let Ok(env) = std::env::var("TREEHUB_ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{env}")).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("TREEHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), AppError> {
        self.collections.validate()?;

        if self.engine.batch_size == 0 {
            return Err(AppError::configuration("engine.batch_size must be > 0"));
        }
        if self.engine.page_size == 0 {
            return Err(AppError::configuration("engine.page_size must be > 0"));
        }
        if self.engine.link_concurrency == 0 {
            return Err(AppError::configuration(
                "engine.link_concurrency must be > 0",
            ));
        }

        Ok(())
    }
}
