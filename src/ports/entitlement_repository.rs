//! Entitlement repository port.
//!
//! Defines the contract for persisting and retrieving Entitlement records.
//! Implementations handle the actual database operations.
//!
//! # Design
//!
//! - **Newest-first lookups**: the webhook processor always acts on the
//!   newest `pending` or `completed` record for an email
//! - **Conditional updates**: `update` is guarded by the record's version;
//!   a concurrent writer makes the update match zero rows and the caller
//!   gets `ConcurrentModification` instead of silently double-applying
//! - **Never deletes**: retention is an external concern

use crate::domain::entitlement::Entitlement;
use crate::domain::foundation::{DomainError, EntitlementId, Timestamp};
use async_trait::async_trait;

/// Repository port for Entitlement persistence.
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Insert a new entitlement record.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, entitlement: &Entitlement) -> Result<(), DomainError>;

    /// Update an existing record, conditional on its version.
    ///
    /// The stored row is only written when its `version` still equals
    /// `entitlement.version`; on success the stored version is incremented.
    ///
    /// # Errors
    ///
    /// - `ConcurrentModification` if another writer got there first
    /// - `EntitlementNotFound` if the record doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, entitlement: &Entitlement) -> Result<(), DomainError>;

    /// Find a record by its ID.
    async fn find_by_id(&self, id: &EntitlementId) -> Result<Option<Entitlement>, DomainError>;

    /// Find a `completed` record carrying this external payment reference.
    ///
    /// This is the idempotency lookup: a hit means the payment was already
    /// applied and redelivery must be a no-op.
    async fn find_completed_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<Entitlement>, DomainError>;

    /// Find the newest `pending` record for this email.
    async fn find_newest_pending(&self, email: &str)
        -> Result<Option<Entitlement>, DomainError>;

    /// Find the newest `completed` record for this email.
    async fn find_newest_completed(
        &self,
        email: &str,
    ) -> Result<Option<Entitlement>, DomainError>;

    /// Find `completed` records whose expiry falls inside the scan horizon.
    ///
    /// Returns records with a non-null `expires_at` at or before
    /// `now + horizon_days`, including those already past, where at least
    /// one notification flag is still unset. Ordering is oldest expiry
    /// first.
    async fn find_expiring_candidates(
        &self,
        now: Timestamp,
        horizon_days: i64,
    ) -> Result<Vec<Entitlement>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn entitlement_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn EntitlementRepository) {}
    }
}
