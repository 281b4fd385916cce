//! Webhook error types for Stripe webhook handling.
//!
//! Defines all error conditions that can occur during webhook processing,
//! with HTTP status code mapping and retryability semantics.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is outside the acceptable window (5 minutes).
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse webhook payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// No email could be derived from the event.
    #[error("Could not resolve customer email")]
    EmailUnresolved,

    /// Attempted state transition is not valid.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Another writer modified the record concurrently.
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Outbound call to the payment provider failed.
    #[error("Provider error: {0}")]
    Provider(String),
}

impl WebhookError {
    /// Returns true if Stripe should retry delivering this webhook.
    ///
    /// Retryable errors indicate temporary failures that may succeed
    /// on subsequent attempts. Retries are safe because every mutation
    /// is guarded by the payment-id idempotency check or a version
    /// conditional update.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_) | WebhookError::Conflict(_) | WebhookError::Provider(_)
        )
    }

    /// Maps the error to an appropriate HTTP status code.
    ///
    /// Status codes determine Stripe's retry behavior:
    /// - 2xx: Event acknowledged, no retry
    /// - 4xx: Client error, no retry
    /// - 5xx: Server error, will retry
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failures - don't retry
            WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }

            // Bad request - don't retry
            WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            // Unresolvable email is acknowledged: the admin was alerted and
            // a retry would not produce a different outcome
            WebhookError::EmailUnresolved => StatusCode::OK,

            // Server errors - will retry
            WebhookError::InvalidTransition(_)
            | WebhookError::Conflict(_)
            | WebhookError::Database(_)
            | WebhookError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ConcurrentModification => WebhookError::Conflict(err.to_string()),
            ErrorCode::InvalidStateTransition => WebhookError::InvalidTransition(err.to_string()),
            _ => WebhookError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Retryability Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn database_error_is_retryable() {
        assert!(WebhookError::Database("connection failed".to_string()).is_retryable());
    }

    #[test]
    fn conflict_is_retryable() {
        assert!(WebhookError::Conflict("version mismatch".to_string()).is_retryable());
    }

    #[test]
    fn provider_error_is_retryable() {
        assert!(WebhookError::Provider("timeout".to_string()).is_retryable());
    }

    #[test]
    fn invalid_signature_is_not_retryable() {
        assert!(!WebhookError::InvalidSignature.is_retryable());
    }

    #[test]
    fn parse_error_is_not_retryable() {
        assert!(!WebhookError::ParseError("bad json".to_string()).is_retryable());
    }

    // ══════════════════════════════════════════════════════════════
    // Status Code Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invalid_signature_returns_unauthorized() {
        assert_eq!(
            WebhookError::InvalidSignature.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn timestamp_out_of_range_returns_unauthorized() {
        assert_eq!(
            WebhookError::TimestampOutOfRange.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn parse_error_returns_bad_request() {
        assert_eq!(
            WebhookError::ParseError("syntax error".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn unresolved_email_is_acknowledged() {
        assert_eq!(WebhookError::EmailUnresolved.status_code(), StatusCode::OK);
    }

    #[test]
    fn database_error_returns_internal_error() {
        assert_eq!(
            WebhookError::Database("connection lost".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn conflict_returns_internal_error() {
        assert_eq!(
            WebhookError::Conflict("lost the race".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Conversion Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn concurrent_modification_maps_to_conflict() {
        let domain_err = DomainError::conflict("version mismatch");
        let err: WebhookError = domain_err.into();
        assert!(matches!(err, WebhookError::Conflict(_)));
    }

    #[test]
    fn other_domain_errors_map_to_database() {
        let domain_err = DomainError::database("pool exhausted");
        let err: WebhookError = domain_err.into();
        assert!(matches!(err, WebhookError::Database(_)));
    }
}
