//! Outbound run-status notifications.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use treehub_core::config::NotificationsConfig;
use treehub_core::error::{AppError, ErrorKind};
use treehub_core::result::AppResult;

/// Delivers one-line run status messages.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Send `message`.
    async fn notify(&self, message: &str) -> AppResult<()>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts `{"text": message}` to an incoming-webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Build a notifier with a request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> AppResult<()> {
        self.client
            .post(&self.url)
            .json(&WebhookPayload { text: message })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "Webhook delivery failed", e)
            })?;
        debug!(url = %self.url, "Notification delivered");
        Ok(())
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, message: &str) -> AppResult<()> {
        debug!(message, "No webhook configured; notification skipped");
        Ok(())
    }
}

/// Webhook notifier when a URL is configured, otherwise a no-op.
pub fn from_config(config: &NotificationsConfig) -> AppResult<Arc<dyn Notifier>> {
    match config.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(
            url,
            Duration::from_secs(config.timeout_seconds),
        )?)),
        None => Ok(Arc::new(NoopNotifier)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let json = serde_json::to_value(WebhookPayload { text: "1/8 SYNC | ok" }).expect("json");
        assert_eq!(json, serde_json::json!({ "text": "1/8 SYNC | ok" }));
    }

    #[tokio::test]
    async fn test_blank_url_is_noop() {
        let config = NotificationsConfig {
            webhook_url: Some("  ".to_string()),
            ..NotificationsConfig::default()
        };
        let notifier = from_config(&config).expect("notifier");
        assert!(notifier.notify("hello").await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_external_error() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:1/hook", Duration::from_secs(2))
            .expect("client");
        let err = notifier.notify("hello").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
    }
}
