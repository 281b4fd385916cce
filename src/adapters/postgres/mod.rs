//! PostgreSQL adapters.

mod debug_log;
mod entitlement_repository;

pub use debug_log::PostgresDebugLogStore;
pub use entitlement_repository::PostgresEntitlementRepository;
