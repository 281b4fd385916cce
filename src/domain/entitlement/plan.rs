//! Plan types and plan resolution.
//!
//! A plan determines how far `expires_at` extends on activation and renewal.
//! Resolution prefers an explicit price catalog; payments whose price is not
//! in the catalog fall back to the legacy amount threshold.

use serde::{Deserialize, Serialize};

/// Paid amounts above this (in cents) are treated as annual purchases
/// when the price is not in the catalog.
pub const ANNUAL_AMOUNT_THRESHOLD_CENTS: i64 = 10_000;

/// Coarse billing plan category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    /// Recurring plan billed every 30 days.
    Monthly,

    /// Recurring plan billed every 365 days.
    Annual,

    /// One-time purchase; no expiry is tracked.
    Lifetime,
}

impl PlanType {
    /// Days one billing cycle lasts, or `None` for lifetime purchases.
    pub fn duration_days(&self) -> Option<i64> {
        match self {
            PlanType::Monthly => Some(30),
            PlanType::Annual => Some(365),
            PlanType::Lifetime => None,
        }
    }

    /// Database/API string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Monthly => "monthly",
            PlanType::Annual => "annual",
            PlanType::Lifetime => "lifetime",
        }
    }

    /// Human-readable name for notifications.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanType::Monthly => "Monthly",
            PlanType::Annual => "Annual",
            PlanType::Lifetime => "Lifetime",
        }
    }
}

/// Resolves a payment to a plan.
///
/// Catalog-first: configured price IDs map directly to a plan. When the
/// price is unknown, the paid amount decides between monthly and annual.
/// A payment without a subscription reference is always a lifetime
/// purchase regardless of amount.
#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    monthly_price_id: Option<String>,
    annual_price_id: Option<String>,
}

impl PlanCatalog {
    /// Creates a catalog from the configured Stripe price IDs.
    pub fn new(monthly_price_id: Option<String>, annual_price_id: Option<String>) -> Self {
        Self {
            monthly_price_id,
            annual_price_id,
        }
    }

    /// Resolves the plan for a payment.
    ///
    /// `price_id` is the Stripe price from the checkout line item (when the
    /// lookup succeeded), `amount_cents` the total paid, and
    /// `has_subscription` whether the session carries a recurring
    /// subscription reference.
    pub fn resolve(
        &self,
        price_id: Option<&str>,
        amount_cents: Option<i64>,
        has_subscription: bool,
    ) -> PlanType {
        if !has_subscription {
            return PlanType::Lifetime;
        }

        if let Some(price) = price_id {
            if self.monthly_price_id.as_deref() == Some(price) {
                return PlanType::Monthly;
            }
            if self.annual_price_id.as_deref() == Some(price) {
                return PlanType::Annual;
            }
        }

        // Legacy fallback for prices not in the catalog.
        match amount_cents {
            Some(amount) if amount > ANNUAL_AMOUNT_THRESHOLD_CENTS => PlanType::Annual,
            _ => PlanType::Monthly,
        }
    }
}
