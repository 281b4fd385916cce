//! Stripe API adapters.

mod directory;

pub use directory::{StripeConfig, StripePaymentDirectory};
