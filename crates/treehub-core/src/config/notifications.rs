//! Run notification configuration.

use serde::{Deserialize, Serialize};

/// Outbound status notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Incoming-webhook URL; notifications are skipped when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// HTTP timeout for webhook delivery in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Version string printed in run banners.
    #[serde(default = "default_app_version")]
    pub app_version: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_seconds: default_timeout(),
            app_version: default_app_version(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
