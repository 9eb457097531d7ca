//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{JogBridgeError, Result};
use crate::motion::{AxisLimits, AxisRange, MachinePosition};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub record: RecordConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_axis_threshold")]
    pub axis_threshold: f64,
}

/// Jog step configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MotionConfig {
    #[serde(default = "default_large_step")]
    pub large_step: f64,

    #[serde(default = "default_stick_step")]
    pub stick_step: f64,

    #[serde(default = "default_feed_rate")]
    pub feed_rate: f64,
}

/// Position record configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RecordConfig {
    #[serde(default = "default_record_path")]
    pub path: String,

    #[serde(default)]
    pub truncate_on_start: bool,
}

/// Simulated machine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_sim_limits")]
    pub limits: [[f64; 2]; 3],

    #[serde(default = "default_sim_start")]
    pub start: [f64; 3],
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 10000 }

fn default_poll_interval_ms() -> u64 { 20 }
fn default_axis_threshold() -> f64 { 0.5 }

fn default_large_step() -> f64 { 10.0 }
fn default_stick_step() -> f64 { 1.0 }
fn default_feed_rate() -> f64 { 6000.0 }

fn default_record_path() -> String { "positions.txt".to_string() }

fn default_sim_limits() -> [[f64; 2]; 3] { [[0.0, 300.0], [0.0, 300.0], [0.0, 300.0]] }
fn default_sim_start() -> [f64; 3] { [150.0, 150.0, 150.0] }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            axis_threshold: default_axis_threshold(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            large_step: default_large_step(),
            stick_step: default_stick_step(),
            feed_rate: default_feed_rate(),
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            path: default_record_path(),
            truncate_on_start: false,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            limits: default_sim_limits(),
            start: default_sim_start(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

impl SimulationConfig {
    /// Limits as an [`AxisLimits`] table.
    #[must_use]
    pub fn axis_limits(&self) -> AxisLimits {
        let [x, y, z] = self.limits.map(|[min, max]| AxisRange::new(min, max));
        AxisLimits::new(x, y, z)
    }

    /// Start position of the simulated control point.
    #[must_use]
    pub fn start_position(&self) -> MachinePosition {
        let [x, y, z] = self.start;
        MachinePosition::new(x, y, z)
    }
}

fn invalid(message: impl std::fmt::Display) -> JogBridgeError {
    JogBridgeError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use jog_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without validating it
    ///
    /// For callers that adjust values (e.g. from the command line) before
    /// calling [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // The serial port is only needed when driving real hardware
        if !self.simulation.enabled && self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if ![9600, 57600, 115200, 230400, 250000].contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 57600, 115200, 230400, 250000",
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 60000 {
            return Err(invalid("timeout_ms must be between 1 and 60000"));
        }

        if self.controller.poll_interval_ms == 0 || self.controller.poll_interval_ms > 1000 {
            return Err(invalid("poll_interval_ms must be between 1 and 1000"));
        }

        if !(0.0..1.0).contains(&self.controller.axis_threshold) {
            return Err(invalid("axis_threshold must be at least 0.0 and below 1.0"));
        }

        for (name, value) in [
            ("large_step", self.motion.large_step),
            ("stick_step", self.motion.stick_step),
            ("feed_rate", self.motion.feed_rate),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("{} must be greater than 0", name)));
            }
        }

        if self.record.path.is_empty() {
            return Err(invalid("record path cannot be empty"));
        }

        for (axis, [min, max]) in ["x", "y", "z"].iter().zip(self.simulation.limits) {
            if min >= max {
                return Err(invalid(format!(
                    "simulation {} limits must have min below max",
                    axis
                )));
            }
        }

        let limits = self.simulation.axis_limits();
        for (axis, (range, start)) in ["x", "y", "z"]
            .iter()
            .zip(limits.0.iter().zip(self.simulation.start))
        {
            if !range.contains(start) {
                return Err(invalid(format!(
                    "simulation start {} must lie within its limits",
                    axis
                )));
            }
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(invalid(
                "logging level must be one of: trace, debug, info, warn, error",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"

[motion]
large_step = 5.0

[record]
path = "tool_setup.txt"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.motion.large_step, 5.0);
        assert_eq!(config.motion.stick_step, 1.0);
        assert_eq!(config.record.path, "tool_setup.txt");
        assert_eq!(config.controller.axis_threshold, 0.5);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.motion.large_step, 10.0);
        assert!(!config.simulation.enabled);
    }

    #[test]
    fn test_read_skips_validation() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[serial]\nport = \"\"\n").unwrap();
        temp_file.flush().unwrap();

        let mut config = Config::read(temp_file.path()).unwrap();
        assert!(config.validate().is_err());

        config.simulation.enabled = true;
        assert!(config.validate().is_ok());
        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = Config::load("/nonexistent/jog-bridge.toml");
        assert!(matches!(result, Err(JogBridgeError::Io(_))));
    }

    #[test]
    fn test_load_invalid_values_rejected() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[motion]\nlarge_step = -1.0\n").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(
            Config::load(temp_file.path()),
            Err(JogBridgeError::Config(_))
        ));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_serial_port_allowed_in_simulation() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        config.simulation.enabled = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &[9600, 57600, 115200, 230400, 250000] {
            let mut config = create_valid_config();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_timeout_ms_zero() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_too_high() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_zero() {
        let mut config = create_valid_config();
        config.controller.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_too_high() {
        let mut config = create_valid_config();
        config.controller.poll_interval_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_axis_threshold_range() {
        let mut config = create_valid_config();
        config.controller.axis_threshold = 1.0;
        assert!(config.validate().is_err());

        config.controller.axis_threshold = -0.1;
        assert!(config.validate().is_err());

        config.controller.axis_threshold = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_steps_must_be_positive() {
        let mut config = create_valid_config();
        config.motion.large_step = 0.0;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.motion.stick_step = -1.0;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.motion.feed_rate = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_record_path() {
        let mut config = create_valid_config();
        config.record.path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_simulation_limits_inverted() {
        let mut config = create_valid_config();
        config.simulation.limits[1] = [200.0, 100.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_simulation_start_outside_limits() {
        let mut config = create_valid_config();
        config.simulation.start = [150.0, 150.0, 301.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_simulation_conversions() {
        let config = create_valid_config();
        let limits = config.simulation.axis_limits();
        assert_eq!(limits.0[2], AxisRange::new(0.0, 300.0));
        assert_eq!(
            config.simulation.start_position(),
            MachinePosition::new(150.0, 150.0, 150.0)
        );
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyACM0");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_timeout_ms(), 10000);
        assert_eq!(default_poll_interval_ms(), 20);
        assert_eq!(default_axis_threshold(), 0.5);
        assert_eq!(default_large_step(), 10.0);
        assert_eq!(default_stick_step(), 1.0);
        assert_eq!(default_feed_rate(), 6000.0);
        assert_eq!(default_record_path(), "positions.txt");
        assert_eq!(default_log_level(), "info");
    }
}
