//! Notification port.
//!
//! Best-effort human-readable alerts. Delivery failure is never
//! escalated: losing an admin message is acceptable, losing a payment
//! record is not. Callers log and swallow errors; nothing about delivery
//! success is persisted.

use async_trait::async_trait;
use thiserror::Error;

/// Error delivering a notification.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// Messaging API rejected the request.
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    /// Network failure reaching the messaging API.
    #[error("Network error: {0}")]
    Network(String),

    /// Notifier is not configured (missing token or recipient).
    #[error("Notifier not configured")]
    NotConfigured,
}

/// Port for dispatching notifications.
///
/// Two narrow methods so the delivery mechanism can be swapped (or made
/// durable via an outbox) without touching the state machine.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a message to the fixed admin channel.
    async fn send_admin(&self, text: &str) -> Result<(), NotifyError>;

    /// Send a message to the customer identified by email, when a
    /// delivery channel for them is known.
    async fn send_customer(&self, email: &str, text: &str) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn notifier_is_object_safe() {
        fn _accepts_dyn(_notifier: &dyn Notifier) {}
    }

    #[test]
    fn notify_error_displays_reason() {
        let err = NotifyError::Rejected("chat not found".to_string());
        assert_eq!(err.to_string(), "Delivery rejected: chat not found");
    }
}
