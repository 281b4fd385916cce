//! Entitlement domain module.
//!
//! Handles the payment-to-entitlement reconciliation lifecycle: activation,
//! renewal, cancellation, and scheduled expiry.
//!
//! # Module Structure
//!
//! - `aggregate` - Entitlement aggregate entity
//! - `status` - EntitlementStatus state machine
//! - `plan` - PlanType durations and plan resolution
//! - `stripe_event` - Stripe webhook event envelope
//! - `payloads` - typed views over event payload objects
//! - `signature` - Webhook signature verification
//! - `webhook_errors` - Webhook processing errors
//! - `expiry` - Expiry-threshold bucket classification

mod aggregate;
mod expiry;
mod payloads;
mod plan;
mod signature;
mod status;
mod stripe_event;
mod webhook_errors;

pub use aggregate::Entitlement;
pub use expiry::{ExpiryBucket, NotificationThreshold, SCAN_HORIZON_DAYS};
pub use payloads::{CheckoutSessionObject, InvoiceObject, SubscriptionObject};
pub use plan::{PlanCatalog, PlanType, ANNUAL_AMOUNT_THRESHOLD_CENTS};
pub use signature::{SignatureHeader, StripeWebhookVerifier};
pub use status::EntitlementStatus;
pub use stripe_event::{StripeEvent, StripeEventData, StripeEventType};
pub use webhook_errors::WebhookError;

#[cfg(test)]
pub use signature::compute_test_signature;
#[cfg(test)]
pub use stripe_event::StripeEventBuilder;
