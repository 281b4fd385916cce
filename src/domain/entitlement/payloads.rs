//! Typed views over Stripe event payload objects.
//!
//! Each struct captures only the fields the webhook processor reads;
//! everything else in Stripe's schema is ignored on deserialization.

use serde::{Deserialize, Serialize};

/// Checkout Session object from `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutSessionObject {
    /// Session identifier (cs_...). Doubles as the external payment
    /// reference stamped onto the entitlement.
    pub id: String,

    /// Customer ID, when Stripe created/attached one.
    pub customer: Option<String>,

    /// Email entered during checkout.
    pub customer_email: Option<String>,

    /// Collected customer details (may carry the email instead).
    pub customer_details: Option<CustomerDetails>,

    /// Subscription ID for recurring purchases.
    pub subscription: Option<String>,

    /// Total paid in cents.
    pub amount_total: Option<i64>,

    /// Currency (lowercase, e.g. "eur").
    pub currency: Option<String>,
}

impl CheckoutSessionObject {
    /// Email directly present on the session, if any.
    pub fn embedded_email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or_else(|| self.customer_details.as_ref().and_then(|d| d.email.as_deref()))
    }
}

/// Customer details collected during checkout.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

/// Invoice object from `invoice.paid` / `invoice.payment_failed`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceObject {
    /// Invoice identifier (in_...).
    pub id: String,

    /// Customer ID.
    pub customer: Option<String>,

    /// Email on the invoice, when present.
    pub customer_email: Option<String>,

    /// Associated subscription ID.
    pub subscription: Option<String>,

    /// Amount paid in cents.
    #[serde(default)]
    pub amount_paid: i64,

    /// Currency (lowercase).
    pub currency: Option<String>,

    /// Why the invoice was created; "subscription_create" marks the
    /// first invoice of a subscription.
    pub billing_reason: Option<String>,

    /// Number of payment attempts made.
    #[serde(default)]
    pub attempt_count: i32,

    /// Invoice line items.
    #[serde(default)]
    pub lines: InvoiceLines,
}

impl InvoiceObject {
    /// True for the subscription's first invoice, which checkout
    /// completion already handled.
    pub fn is_first_invoice(&self) -> bool {
        self.billing_reason.as_deref() == Some("subscription_create")
    }

    /// Product ID on the first invoice line, if any.
    pub fn first_line_product(&self) -> Option<&str> {
        self.lines
            .data
            .first()
            .and_then(|line| line.price.as_ref())
            .map(|price| price.product.as_str())
    }
}

/// Invoice lines container.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InvoiceLines {
    #[serde(default)]
    pub data: Vec<InvoiceLine>,
}

/// Single invoice line item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceLine {
    pub price: Option<PriceRef>,
}

/// Price reference embedded in a line item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceRef {
    /// Price ID (price_...).
    pub id: String,

    /// Product ID (prod_...) this price belongs to.
    pub product: String,
}

/// Subscription object from `customer.subscription.deleted`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionObject {
    /// Subscription identifier (sub_...).
    pub id: String,

    /// Customer ID owning this subscription.
    pub customer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_session_parses_minimal_payload() {
        let json = r#"{
            "id": "cs_test_abc",
            "customer": "cus_123",
            "subscription": "sub_456",
            "amount_total": 2900,
            "currency": "eur"
        }"#;

        let session: CheckoutSessionObject = serde_json::from_str(json).unwrap();
        assert_eq!(session.id, "cs_test_abc");
        assert_eq!(session.amount_total, Some(2900));
        assert!(session.embedded_email().is_none());
    }

    #[test]
    fn embedded_email_prefers_customer_email() {
        let json = r#"{
            "id": "cs_1",
            "customer_email": "direct@example.com",
            "customer_details": {"email": "details@example.com"}
        }"#;

        let session: CheckoutSessionObject = serde_json::from_str(json).unwrap();
        assert_eq!(session.embedded_email(), Some("direct@example.com"));
    }

    #[test]
    fn embedded_email_falls_back_to_customer_details() {
        let json = r#"{
            "id": "cs_1",
            "customer_details": {"email": "details@example.com"}
        }"#;

        let session: CheckoutSessionObject = serde_json::from_str(json).unwrap();
        assert_eq!(session.embedded_email(), Some("details@example.com"));
    }

    #[test]
    fn invoice_detects_first_invoice() {
        let json = r#"{
            "id": "in_1",
            "customer": "cus_123",
            "billing_reason": "subscription_create"
        }"#;

        let invoice: InvoiceObject = serde_json::from_str(json).unwrap();
        assert!(invoice.is_first_invoice());
    }

    #[test]
    fn invoice_renewal_is_not_first_invoice() {
        let json = r#"{
            "id": "in_2",
            "customer": "cus_123",
            "billing_reason": "subscription_cycle"
        }"#;

        let invoice: InvoiceObject = serde_json::from_str(json).unwrap();
        assert!(!invoice.is_first_invoice());
    }

    #[test]
    fn invoice_first_line_product_reads_nested_price() {
        let json = r#"{
            "id": "in_3",
            "customer": "cus_123",
            "lines": {
                "data": [
                    {"price": {"id": "price_m", "product": "prod_analyzer"}}
                ]
            }
        }"#;

        let invoice: InvoiceObject = serde_json::from_str(json).unwrap();
        assert_eq!(invoice.first_line_product(), Some("prod_analyzer"));
    }

    #[test]
    fn invoice_without_lines_has_no_product() {
        let json = r#"{"id": "in_4", "customer": "cus_123"}"#;
        let invoice: InvoiceObject = serde_json::from_str(json).unwrap();
        assert!(invoice.first_line_product().is_none());
        assert_eq!(invoice.attempt_count, 0);
        assert_eq!(invoice.amount_paid, 0);
    }

    #[test]
    fn subscription_parses_customer_reference() {
        let json = r#"{"id": "sub_9", "customer": "cus_777"}"#;
        let sub: SubscriptionObject = serde_json::from_str(json).unwrap();
        assert_eq!(sub.customer, "cus_777");
    }
}
