//! Entitlement status state machine.
//!
//! Defines all possible entitlement states and valid transitions
//! according to the payment lifecycle.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Entitlement payment status.
///
/// Represents where a purchase attempt sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementStatus {
    /// Created when the user started checkout; payment not yet confirmed.
    Pending,

    /// Payment confirmed. Grants paid access until `expires_at`.
    Completed,

    /// Subscription ended, by cancellation or by the expiry sweep.
    /// Terminal: a later payment creates a new record.
    Expired,

    /// Payment attempt failed. Only ever set externally; the webhook
    /// processor does not move existing records here.
    Failed,
}

impl EntitlementStatus {
    /// Returns true if this status grants paid access.
    pub fn grants_access(&self) -> bool {
        matches!(self, EntitlementStatus::Completed)
    }

    /// Database/API string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementStatus::Pending => "pending",
            EntitlementStatus::Completed => "completed",
            EntitlementStatus::Expired => "expired",
            EntitlementStatus::Failed => "failed",
        }
    }
}

impl StateMachine for EntitlementStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use EntitlementStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Completed)
            // From COMPLETED
                | (Completed, Completed) // Renewal
                | (Completed, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use EntitlementStatus::*;
        match self {
            Pending => vec![Completed],
            Completed => vec![Completed, Expired],
            Expired => vec![],
            Failed => vec![],
        }
    }
}
