//! Crypto Analyzer Pro - Billing and Entitlement Backend
//!
//! This crate reconciles Stripe payment lifecycle events into durable
//! entitlement records and runs the daily expiry sweep that downgrades
//! lapsed subscriptions back to the free tier.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
