use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thermoguard_core::{DEFAULT_COOL_C, DEFAULT_HIGH_C, DEFAULT_SENSOR_PROGRAM};

/// Main configuration for the thermoguard supervisor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Thermal thresholds
    pub thermal: ThermalConfig,

    /// Sensor query command
    pub sensor: SensorConfig,

    /// Supervision loop settings
    pub monitoring: MonitoringConfig,

    /// Logging and stats output
    pub logging: LogConfig,
}

/// Thermal threshold configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Pause threshold in °C (default: 90.0)
    pub high_c: f64,

    /// Resume threshold in °C (default: 77.0)
    /// Must stay below high_c to provide a hysteresis band
    pub cool_c: f64,
}

/// Sensor command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Program queried once per tick (default: "sensors")
    pub program: String,

    /// Arguments passed to the sensor program
    pub args: Vec<String>,
}

/// Supervision loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Sampling interval in milliseconds (default: 1000)
    pub tick_interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory for rolling log files; stdout only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Write a JSON stats snapshot here when supervision ends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thermal: ThermalConfig::default(),
            sensor: SensorConfig::default(),
            monitoring: MonitoringConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            high_c: DEFAULT_HIGH_C,
            cool_c: DEFAULT_COOL_C,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_SENSOR_PROGRAM.to_string(),
            args: Vec::new(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            stats_file: None,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load_from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !self.thermal.high_c.is_finite() || !self.thermal.cool_c.is_finite() {
            return Err("Thermal thresholds must be finite".to_string());
        }

        if self.thermal.high_c <= self.thermal.cool_c {
            return Err(format!(
                "High threshold ({}) must be above cool threshold ({})",
                self.thermal.high_c, self.thermal.cool_c
            ));
        }

        if self.sensor.program.is_empty() {
            return Err("Sensor program must not be empty".to_string());
        }

        if self.monitoring.tick_interval_ms == 0 {
            return Err("Tick interval must be > 0".to_string());
        }

        Ok(())
    }
}
