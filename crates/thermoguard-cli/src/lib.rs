//! Thermoguard supervisor binary internals.

pub mod config;
pub mod supervisor;

pub use config::Config;
pub use supervisor::Supervisor;
