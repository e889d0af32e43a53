use crate::error::{Error, Result};
use regex::Regex;
use std::process::Command;
use tracing::warn;

/// Default sensor query command (lm-sensors front-end).
pub const DEFAULT_SENSOR_PROGRAM: &str = "sensors";

// 'Tctl:' label followed by a signed decimal, e.g. "Tctl:  +61.5°C"
const TCTL_PATTERN: &str = r"Tctl:\s+([+-]?\d+\.\d+)";

/// Source of temperature readings.
///
/// A reading is produced fresh on each call; `None` means the temperature
/// is unknown for this sample and the caller must skip transition logic,
/// never reuse an older value.
pub trait TemperatureSource {
    fn sample(&self) -> Option<f64>;
}

/// Temperature source backed by an external sensor command.
///
/// Runs the command once per sample and extracts the first `Tctl:` reading
/// from its stdout. Only the first occurrence is consulted.
pub struct SensorCommand {
    program: String,
    args: Vec<String>,
    pattern: Regex,
}

impl SensorCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            pattern: Regex::new(TCTL_PATTERN).expect("temperature pattern is valid"),
        }
    }

    /// Run the sensor command and capture its stdout.
    fn query(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| Error::Sensor(format!("Failed to run '{}': {}", self.program, e)))?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Extract the first matching reading from sensor output.
    fn extract(&self, text: &str) -> Option<f64> {
        let captures = self.pattern.captures(text)?;
        captures.get(1)?.as_str().parse::<f64>().ok()
    }
}

impl Default for SensorCommand {
    fn default() -> Self {
        Self::new(DEFAULT_SENSOR_PROGRAM, Vec::new())
    }
}

impl TemperatureSource for SensorCommand {
    fn sample(&self) -> Option<f64> {
        let text = match self.query() {
            Ok(text) => text,
            Err(e) => {
                warn!("Sensor query failed: {}", e);
                return None;
            }
        };

        self.extract(&text)
    }
}
