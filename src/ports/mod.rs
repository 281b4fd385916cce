//! Ports - interfaces between the application core and the outside world.
//!
//! Adapters implement these traits; application handlers depend only on
//! the traits, which keeps every external service swappable and testable
//! with in-memory fakes.

mod debug_log;
mod entitlement_repository;
mod notifier;
mod payment_directory;

pub use debug_log::DebugLogStore;
pub use entitlement_repository::EntitlementRepository;
pub use notifier::{Notifier, NotifyError};
pub use payment_directory::{CheckoutLineItem, PaymentDirectory};
