//! HTTP handlers.

pub mod datasets;
pub mod health;
pub mod metrics;
pub mod tps;
pub mod wallets;
