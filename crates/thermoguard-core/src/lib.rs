//! Thermoguard Core Library
//!
//! Core library for thermoguard - thermal-aware process tree supervision.
//! Provides temperature sampling, descendant enumeration, pause/resume
//! signaling and the hysteresis controller tying them together.

pub mod controller;
pub mod error;
pub mod proctree;
pub mod sensor;
pub mod signaler;
pub mod types;

pub use controller::{ThermalController, DEFAULT_COOL_C, DEFAULT_HIGH_C};
pub use error::{Error, Result};
pub use proctree::{descendants, ChildLookup, DescendantWalk, PgrepLookup};
pub use sensor::{SensorCommand, TemperatureSource, DEFAULT_SENSOR_PROGRAM};
pub use signaler::{KillSignaler, ProcessSignaler, SignalKind};
pub use types::{ControllerState, SupervisorStats, Transition};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
