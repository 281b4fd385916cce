//! Notification configuration (Telegram)

use serde::Deserialize;

use super::error::ValidationError;

/// Notification configuration (Telegram Bot API)
///
/// Notifications are a convenience channel: the whole section is
/// optional and the service runs fine without it, delivery is just
/// skipped with a warning.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Telegram bot token
    #[serde(default)]
    pub telegram_bot_token: String,

    /// Chat ID of the admin channel
    #[serde(default)]
    pub admin_chat_id: String,

    /// Dashboard URL linked from customer notifications
    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,

    /// Support email shown in customer notifications
    #[serde(default = "default_support_email")]
    pub support_email: String,
}

impl NotificationConfig {
    /// True when both token and admin recipient are present.
    pub fn is_configured(&self) -> bool {
        !self.telegram_bot_token.is_empty() && !self.admin_chat_id.is_empty()
    }

    /// Validate notification configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.admin_chat_id.is_empty()
            && !self.admin_chat_id.trim_start_matches('-').chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationError::InvalidAdminChatId);
        }
        Ok(())
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: String::new(),
            admin_chat_id: String::new(),
            dashboard_url: default_dashboard_url(),
            support_email: default_support_email(),
        }
    }
}

fn default_dashboard_url() -> String {
    "https://dashboard.cryptoanalyzerpro.com".to_string()
}

fn default_support_email() -> String {
    "support@cryptoanalyzerpro.com".to_string()
}
