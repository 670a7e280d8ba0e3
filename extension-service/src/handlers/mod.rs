//! Host-independent HTTP handlers.

pub mod health;
pub mod metrics;
