//! HTTP adapter - axum routes, handlers, and DTOs.

mod dto;
mod handlers;
mod routes;

pub use handlers::BillingAppState;
pub use routes::{billing_router, job_routes, webhook_routes};
