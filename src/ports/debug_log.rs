//! Debug log store port.
//!
//! A persisted free-text log entry per invocation, for post-hoc
//! troubleshooting of webhook deliveries and scan runs. Not part of the
//! entitlement model; appends are best-effort and a failure to log must
//! never fail the request.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Port for appending free-text debug log entries.
#[async_trait]
pub trait DebugLogStore: Send + Sync {
    /// Append one log entry.
    async fn append(&self, entry: &str) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn debug_log_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn DebugLogStore) {}
    }
}
