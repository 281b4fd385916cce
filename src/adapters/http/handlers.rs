//! HTTP handlers for the billing endpoints.
//!
//! These handlers connect axum routes to the application layer. The
//! webhook route carries no user authentication: authenticity comes from
//! the provider signature, which the processor checks before anything
//! else.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};

use crate::application::{ExpiryScanJob, PaymentEventProcessor, ProcessWebhookCommand};
use crate::ports::DebugLogStore;

use super::dto::{ErrorResponse, ScanResponse, SelfTestResponse, WebhookAck};

/// Shared application state containing all dependencies.
///
/// Cloned per request; every dependency is Arc-wrapped and constructed
/// once at startup, so there is no hidden shared state between
/// concurrent invocations.
#[derive(Clone)]
pub struct BillingAppState {
    pub processor: Arc<PaymentEventProcessor>,
    pub scan_job: Arc<ExpiryScanJob>,
    pub debug_log: Arc<dyn DebugLogStore>,
}

/// POST /webhooks/stripe - process one signed payment event.
///
/// Responses drive the provider's retry behavior: 2xx acknowledges
/// (including ignored events), 4xx drops the delivery, 5xx makes the
/// provider retry.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Webhook delivery without stripe-signature header");
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Missing signature")),
        )
            .into_response();
    };

    let cmd = ProcessWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    match state.processor.handle(cmd).await {
        Ok(outcome) => {
            tracing::debug!(outcome = outcome.label(), "Webhook processed");
            (StatusCode::OK, Json(WebhookAck::ok())).into_response()
        }
        Err(e) => {
            let status = e.status_code();
            if status == StatusCode::OK {
                // Acknowledged failure (e.g. unresolvable email): a retry
                // would not change the outcome.
                return (status, Json(WebhookAck::ok())).into_response();
            }
            tracing::warn!(error = %e, status = %status, "Webhook processing failed");
            (status, Json(ErrorResponse::new(e.to_string()))).into_response()
        }
    }
}

/// GET /webhooks/stripe - connectivity self-test.
///
/// Writes a probe entry through the debug-log store to confirm the
/// database path works end to end.
pub async fn webhook_self_test(State(state): State<BillingAppState>) -> axum::response::Response {
    match state
        .debug_log
        .append("DB CONNECTION TEST SUCCESSFUL")
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(SelfTestResponse::ok("DB CONNECTION TEST SUCCESSFUL")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Self-test failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SelfTestResponse::error(e.to_string())),
            )
                .into_response()
        }
    }
}

/// POST /jobs/check-expiring - run the daily expiry sweep.
///
/// Invoked by a time-based trigger; takes no input payload.
pub async fn run_expiry_scan(State(state): State<BillingAppState>) -> axum::response::Response {
    match state.scan_job.run().await {
        Ok(summary) => (StatusCode::OK, Json(ScanResponse::from(summary))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Expiry scan failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /health - liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}
