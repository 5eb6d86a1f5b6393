//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod postgres;
pub mod telemetry;
