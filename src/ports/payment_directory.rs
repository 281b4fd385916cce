//! Payment directory port for lookups against the payment provider.
//!
//! The webhook payload doesn't always carry everything the processor
//! needs: cancellation events only reference a customer ID, and checkout
//! sessions don't embed their line items. This port covers those two
//! secondary lookups.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::entitlement::WebhookError;

/// First line item of a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLineItem {
    /// Product ID (prod_...) the customer purchased.
    pub product_id: String,

    /// Price ID (price_...) used for the purchase.
    pub price_id: Option<String>,
}

/// Port for secondary lookups against the payment provider's API.
#[async_trait]
pub trait PaymentDirectory: Send + Sync {
    /// Resolve a customer's email by their provider customer ID.
    ///
    /// Returns `None` for deleted customers or customers without an email.
    ///
    /// # Errors
    ///
    /// - `Provider` on network or API failure
    async fn customer_email(&self, customer_id: &str) -> Result<Option<String>, WebhookError>;

    /// Fetch the first line item of a checkout session.
    ///
    /// Used for the product allow-list check. Returns `None` when the
    /// session has no line items.
    ///
    /// # Errors
    ///
    /// - `Provider` on network or API failure
    async fn checkout_line_item(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutLineItem>, WebhookError>;
}
