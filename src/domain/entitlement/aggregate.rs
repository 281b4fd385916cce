//! Entitlement aggregate entity.
//!
//! One Entitlement per purchase attempt. A user may accumulate several
//! historical records; only the newest `completed` one carries the active
//! subscription.
//!
//! # Design Decisions
//!
//! - **Money in cents**: monetary values stored as i64 cents (not floats)
//! - **Forward-only expiry**: `expires_at` never moves backward; renewal
//!   extends it from whichever is later, now or the current expiry
//! - **Versioned writes**: `version` backs optimistic concurrency in the
//!   repository; every mutation here bumps `updated_at`, the store bumps
//!   the version on a successful conditional update

use crate::domain::foundation::{DomainError, EntitlementId, ErrorCode, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::expiry::NotificationThreshold;
use super::{EntitlementStatus, PlanType};

/// Entitlement aggregate - one payment lifecycle for one user.
///
/// # Invariants
///
/// - `id` is globally unique
/// - at most one record per `(user_email, payment_id)` reaches `completed`
///   (enforced by the idempotency check before activation)
/// - `notified_*` flags only go false -> true until a renewal resets all three
/// - `expires_at`, once set, only moves forward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Unique identifier for this record.
    pub id: EntitlementId,

    /// Email of the paying user. Not unique across records.
    pub user_email: String,

    /// Billing plan; drives expiry-duration math. Immutable after creation.
    pub plan: PlanType,

    /// Current lifecycle status.
    pub status: EntitlementStatus,

    /// External payment reference, written once on activation.
    /// Used as the idempotency key for duplicate webhook delivery.
    pub payment_id: Option<String>,

    /// Recurring-billing subscription reference (recurring plans only).
    pub subscription_id: Option<String>,

    /// When paid access lapses. None = no expiry tracked.
    pub expires_at: Option<Timestamp>,

    /// Seven-day expiry warning already sent this cycle.
    pub notified_7d: bool,

    /// One-day expiry warning already sent this cycle.
    pub notified_1d: bool,

    /// Expiry notice already sent (also set on cancellation to suppress
    /// a duplicate from the scan job).
    pub notified_expired: bool,

    /// When the record was created.
    pub created_at: Timestamp,

    /// When the record was last updated.
    pub updated_at: Timestamp,

    /// Optimistic-concurrency version, incremented by the store on update.
    pub version: i32,
}

impl Entitlement {
    /// Create a speculative record when the user starts checkout.
    pub fn new_pending(id: EntitlementId, user_email: impl Into<String>, plan: PlanType) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            user_email: user_email.into(),
            plan,
            status: EntitlementStatus::Pending,
            payment_id: None,
            subscription_id: None,
            expires_at: None,
            notified_7d: false,
            notified_1d: false,
            notified_expired: false,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Create a record directly in `completed` state.
    ///
    /// Used when a webhook arrives for a user with no matching pending
    /// record (e.g. checkout initiated outside the dashboard).
    pub fn new_completed(
        id: EntitlementId,
        user_email: impl Into<String>,
        plan: PlanType,
        payment_id: impl Into<String>,
        subscription_id: Option<String>,
        expires_at: Option<Timestamp>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            user_email: user_email.into(),
            plan,
            status: EntitlementStatus::Completed,
            payment_id: Some(payment_id.into()),
            subscription_id,
            expires_at,
            notified_7d: false,
            notified_1d: false,
            notified_expired: false,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Activate this record after payment confirmation.
    ///
    /// # Errors
    ///
    /// Returns error if the record is not `pending`.
    pub fn complete(
        &mut self,
        payment_id: impl Into<String>,
        subscription_id: Option<String>,
        expires_at: Option<Timestamp>,
    ) -> Result<(), DomainError> {
        self.transition_to(EntitlementStatus::Completed)?;
        self.payment_id = Some(payment_id.into());
        if subscription_id.is_some() {
            self.subscription_id = subscription_id;
        }
        self.expires_at = expires_at;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Extend the subscription for a new billing cycle.
    ///
    /// The new expiry must not move backward. Resets all notification
    /// flags so the new cycle gets its own warnings.
    ///
    /// # Errors
    ///
    /// Returns error if the record is not `completed` or the new expiry
    /// precedes the current one.
    pub fn renew(
        &mut self,
        new_expires_at: Timestamp,
        subscription_id: Option<String>,
    ) -> Result<(), DomainError> {
        if let Some(current) = self.expires_at {
            if new_expires_at.is_before(&current) {
                return Err(DomainError::validation(
                    "expires_at",
                    format!(
                        "Renewal cannot move expiry backward ({} -> {})",
                        current, new_expires_at
                    ),
                ));
            }
        }

        self.transition_to(EntitlementStatus::Completed)?;
        self.expires_at = Some(new_expires_at);
        if subscription_id.is_some() {
            self.subscription_id = subscription_id;
        }
        self.notified_7d = false;
        self.notified_1d = false;
        self.notified_expired = false;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Mark this record as expired.
    ///
    /// Sets `notified_expired` so the scan job does not send a duplicate
    /// notice for a record expired via cancellation.
    ///
    /// # Errors
    ///
    /// Returns error if the record is not `completed`.
    pub fn expire(&mut self) -> Result<(), DomainError> {
        self.transition_to(EntitlementStatus::Expired)?;
        self.notified_expired = true;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Record that the warning for the given threshold has been sent.
    pub fn mark_notified(&mut self, threshold: NotificationThreshold) {
        match threshold {
            NotificationThreshold::SevenDays => self.notified_7d = true,
            NotificationThreshold::OneDay => self.notified_1d = true,
            NotificationThreshold::Expired => self.notified_expired = true,
        }
        self.updated_at = Timestamp::now();
    }

    /// Returns true if the warning for the given threshold was already sent.
    pub fn already_notified(&self, threshold: NotificationThreshold) -> bool {
        match threshold {
            NotificationThreshold::SevenDays => self.notified_7d,
            NotificationThreshold::OneDay => self.notified_1d,
            NotificationThreshold::Expired => self.notified_expired,
        }
    }

    /// Time left until expiry as seen from `now`.
    ///
    /// Negative when already past; `None` when no expiry is tracked.
    pub fn remaining_until_expiry(&self, now: Timestamp) -> Option<Duration> {
        self.expires_at.map(|e| e.duration_since(&now))
    }

    fn transition_to(&mut self, target: EntitlementStatus) -> Result<(), DomainError> {
        use crate::domain::foundation::StateMachine;

        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition entitlement from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
