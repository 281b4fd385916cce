//! Axum router configuration for the billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    handle_stripe_webhook, health, run_expiry_scan, webhook_self_test, BillingAppState,
};

/// Create the webhook router.
///
/// Webhooks carry no user authentication; they are verified via the
/// provider signature.
///
/// # Routes
/// - `POST /stripe` - Handle Stripe webhooks
/// - `GET /stripe` - Connectivity self-test
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook).get(webhook_self_test))
}

/// Create the scheduled-job router.
///
/// # Routes
/// - `POST /check-expiring` - Run the daily expiry sweep
pub fn job_routes() -> Router<BillingAppState> {
    Router::new().route("/check-expiring", post(run_expiry_scan))
}

/// Create the complete billing router.
///
/// # Example
///
/// ```ignore
/// let app = billing_router().with_state(app_state);
/// axum::serve(listener, app).await?;
/// ```
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/webhooks", webhook_routes())
        .nest("/jobs", job_routes())
        .route("/health", get(health))
}
