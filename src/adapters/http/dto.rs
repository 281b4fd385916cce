//! Response DTOs for the billing HTTP surface.

use serde::Serialize;

use crate::application::ScanSummary;

/// Acknowledgement body for webhook deliveries.
///
/// Stripe only cares about the status code; the body is for humans
/// reading delivery logs.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self { received: true }
    }
}

/// Generic error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Body of the GET connectivity self-test.
#[derive(Debug, Serialize)]
pub struct SelfTestResponse {
    pub status: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SelfTestResponse {
    pub fn ok(data: impl Into<String>) -> Self {
        Self {
            status: "ok",
            data: Some(data.into()),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Body of the scheduled expiry-scan run.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub status: &'static str,
    pub expired: u32,
    pub notified_1d: u32,
    pub notified_7d: u32,
    pub summary: String,
}

impl From<ScanSummary> for ScanResponse {
    fn from(summary: ScanSummary) -> Self {
        Self {
            status: "ok",
            expired: summary.expired,
            notified_1d: summary.notified_1d,
            notified_7d: summary.notified_7d,
            summary: summary.summary_line(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_ack_serializes() {
        let json = serde_json::to_string(&WebhookAck::ok()).unwrap();
        assert_eq!(json, r#"{"received":true}"#);
    }

    #[test]
    fn self_test_ok_omits_message() {
        let json = serde_json::to_string(&SelfTestResponse::ok("probe written")).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("probe written"));
        assert!(!json.contains("message"));
    }

    #[test]
    fn self_test_error_omits_data() {
        let json = serde_json::to_string(&SelfTestResponse::error("db down")).unwrap();
        assert!(json.contains("\"status\":\"error\""));
        assert!(!json.contains("data"));
    }

    #[test]
    fn scan_response_copies_counts() {
        let summary = ScanSummary {
            expired: 2,
            notified_1d: 1,
            notified_7d: 3,
        };
        let response = ScanResponse::from(summary);
        assert_eq!(response.expired, 2);
        assert_eq!(response.notified_1d, 1);
        assert_eq!(response.notified_7d, 3);
        assert!(response.summary.contains("2 expired"));
    }
}
