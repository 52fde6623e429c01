//! Axum route handlers.

pub mod analysis;
pub mod health;
pub mod outputs;
pub mod progress;
pub mod targets;
