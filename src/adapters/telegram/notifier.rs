//! Telegram Bot API notifier.
//!
//! Implements the `Notifier` port over the Telegram `sendMessage` API.
//! Admin messages go to the configured admin chat with Markdown parse
//! mode. Customer messages have no per-customer chat channel: they are
//! logged as queued so a durable channel (email provider, outbox) can
//! take over behind the same port later.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::ports::{Notifier, NotifyError};

/// Telegram Bot API configuration.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    bot_token: SecretString,

    /// Chat ID of the admin channel.
    admin_chat_id: String,

    /// Base URL for the Bot API (default: https://api.telegram.org).
    api_base_url: String,
}

impl TelegramConfig {
    /// Create a new Telegram configuration.
    pub fn new(bot_token: impl Into<String>, admin_chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: SecretString::new(bot_token.into()),
            admin_chat_id: admin_chat_id.into(),
            api_base_url: "https://api.telegram.org".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Telegram implementation of the Notifier port.
///
/// Construct with `new` when notification config is present, or
/// `disabled` otherwise; a disabled notifier reports `NotConfigured`
/// and callers log-and-continue.
pub struct TelegramNotifier {
    config: Option<TelegramConfig>,
    http_client: reqwest::Client,
}

impl TelegramNotifier {
    /// Create a notifier that delivers through the Bot API.
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config: Some(config),
            http_client: reqwest::Client::new(),
        }
    }

    /// Create a notifier with no delivery channel.
    pub fn disabled() -> Self {
        Self {
            config: None,
            http_client: reqwest::Client::new(),
        }
    }
}

/// Response envelope from the Bot API.
#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_admin(&self, text: &str) -> Result<(), NotifyError> {
        let Some(config) = &self.config else {
            return Err(NotifyError::NotConfigured);
        };

        let url = format!(
            "{}/bot{}/sendMessage",
            config.api_base_url,
            config.bot_token.expose_secret()
        );

        let response = self
            .http_client
            .post(&url)
            .json(&json!({
                "chat_id": config.admin_chat_id,
                "text": text,
                "parse_mode": "Markdown"
            }))
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let body: TelegramResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !body.ok {
            return Err(NotifyError::Rejected(
                body.description.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        tracing::debug!("Telegram admin notification sent");
        Ok(())
    }

    async fn send_customer(&self, email: &str, text: &str) -> Result<(), NotifyError> {
        // No per-customer Telegram chat exists; the message is recorded in
        // the service log so support can follow up, and a real customer
        // channel can replace this without touching callers.
        tracing::info!(email = %email, message = %text, "Customer notification queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_notifier_reports_not_configured() {
        let notifier = TelegramNotifier::disabled();
        let result = notifier.send_admin("hello").await;
        assert!(matches!(result, Err(NotifyError::NotConfigured)));
    }

    #[tokio::test]
    async fn customer_messages_are_queued_even_when_disabled() {
        let notifier = TelegramNotifier::disabled();
        let result = notifier.send_customer("c@example.com", "hello").await;
        assert!(result.is_ok());
    }

    #[test]
    fn telegram_response_parses_error_description() {
        let json = r#"{"ok": false, "description": "chat not found"}"#;
        let response: TelegramResponse = serde_json::from_str(json).unwrap();
        assert!(!response.ok);
        assert_eq!(response.description.as_deref(), Some("chat not found"));
    }

    #[test]
    fn config_base_url_override() {
        let config = TelegramConfig::new("123:abc", "5454410388")
            .with_base_url("http://localhost:8081");
        assert_eq!(config.api_base_url, "http://localhost:8081");
    }
}
