//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, ServoError};
use crate::serial::LinkSettings;
use crate::servo::registers::{MAX_WORKING_CURRENT_MA, MIN_WORKING_CURRENT_MA};
use crate::servo::types::{HoldCurrent, WorkMode};
use crate::servo::SetupPlan;

/// Baud rates the SERVO42D can be configured for
pub const SUPPORTED_BAUD_RATES: [u32; 7] = [9_600, 19_200, 25_000, 38_400, 57_600, 115_200, 256_000];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub servo: ServoConfig,

    #[serde(default)]
    pub setup: SetupConfig,
}

/// Serial link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path; empty means auto-detect
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Longest wait for the first response byte
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Silence that ends a response frame
    #[serde(default = "default_frame_gap_ms")]
    pub frame_gap_ms: u64,
}

/// Target controller
#[derive(Debug, Deserialize, Clone)]
pub struct ServoConfig {
    #[serde(default = "default_slave_address")]
    pub slave_address: u8,

    #[serde(default = "default_microsteps_per_step")]
    pub microsteps_per_step: u16,

    #[serde(default = "default_steps_per_revolution")]
    pub steps_per_revolution: u16,
}

/// Values for the one-shot setup routine
#[derive(Debug, Deserialize, Clone)]
pub struct SetupConfig {
    #[serde(default)]
    pub run_on_start: bool,

    #[serde(default = "default_work_mode")]
    pub work_mode: WorkMode,

    #[serde(default = "default_working_current_ma")]
    pub working_current_ma: u16,

    #[serde(default = "default_hold_current_percent")]
    pub hold_current_percent: u8,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 38_400 }
fn default_timeout_ms() -> u64 { 1000 }
fn default_frame_gap_ms() -> u64 { 20 }

fn default_slave_address() -> u8 { 1 }
fn default_microsteps_per_step() -> u16 { 16 }
fn default_steps_per_revolution() -> u16 { 200 }

fn default_work_mode() -> WorkMode { WorkMode::SrClose }
fn default_working_current_ma() -> u16 { 1000 }
fn default_hold_current_percent() -> u8 { 50 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            frame_gap_ms: default_frame_gap_ms(),
        }
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            slave_address: default_slave_address(),
            microsteps_per_step: default_microsteps_per_step(),
            steps_per_revolution: default_steps_per_revolution(),
        }
    }
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            run_on_start: false,
            work_mode: default_work_mode(),
            working_current_ma: default_working_current_ma(),
            hold_current_percent: default_hold_current_percent(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> ServoError {
    ServoError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
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
    /// use servo42d_modbus::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Serial line settings for [`crate::serial::RtuSerial::open`]
    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            baud_rate: self.serial.baud_rate,
            timeout: Duration::from_millis(self.serial.timeout_ms),
            frame_gap: Duration::from_millis(self.serial.frame_gap_ms),
        }
    }

    /// Setup routine values
    ///
    /// # Errors
    ///
    /// Returns error if the holding current is not a multiple of ten
    /// between 10 and 100.
    pub fn setup_plan(&self) -> Result<SetupPlan> {
        let hold_current = HoldCurrent::from_percent(self.setup.hold_current_percent)
            .ok_or_else(|| invalid("hold_current_percent must be a multiple of 10 between 10 and 100"))?;

        Ok(SetupPlan {
            work_mode: self.setup.work_mode,
            working_current_ma: self.setup.working_current_ma,
            hold_current,
            microsteps_per_step: self.servo.microsteps_per_step,
            steps_per_revolution: self.servo.steps_per_revolution,
        })
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Serial link
        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 25000, 38400, 57600, 115200, 256000",
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.frame_gap_ms == 0 || self.serial.frame_gap_ms > 1000 {
            return Err(invalid("frame_gap_ms must be between 1 and 1000"));
        }

        if self.serial.frame_gap_ms >= self.serial.timeout_ms {
            return Err(invalid("frame_gap_ms must be less than timeout_ms"));
        }

        // Broadcast (0) never gets a reply, 248+ are reserved
        if self.servo.slave_address == 0 || self.servo.slave_address > 247 {
            return Err(invalid("slave_address must be between 1 and 247"));
        }

        if self.servo.microsteps_per_step == 0 || self.servo.microsteps_per_step > 256 {
            return Err(invalid("microsteps_per_step must be between 1 and 256"));
        }

        if self.servo.steps_per_revolution == 0 {
            return Err(invalid("steps_per_revolution must be greater than 0"));
        }

        // Setup routine
        if !(MIN_WORKING_CURRENT_MA..=MAX_WORKING_CURRENT_MA).contains(&self.setup.working_current_ma) {
            return Err(invalid(format!(
                "working_current_ma must be between {} and {}",
                MIN_WORKING_CURRENT_MA, MAX_WORKING_CURRENT_MA
            )));
        }

        self.setup_plan()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> Config {
        Config {
            serial: SerialConfig::default(),
            servo: ServoConfig::default(),
            setup: SetupConfig::default(),
        }
    }

    fn assert_invalid(config: &Config, fragment: &str) {
        match config.validate() {
            Err(ServoError::Config(e)) => assert!(
                e.to_string().contains(fragment),
                "Error '{}' should mention '{}'",
                e,
                fragment
            ),
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = create_valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.baud_rate, 38_400);
        assert_eq!(config.servo.slave_address, 1);
        assert_eq!(config.setup.work_mode, WorkMode::SrClose);
        assert!(!config.setup.run_on_start);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.timeout_ms, 1000);
        assert_eq!(config.serial.frame_gap_ms, 20);
        assert_eq!(config.servo.microsteps_per_step, 16);
        assert_eq!(config.servo.steps_per_revolution, 200);
    }

    #[test]
    fn test_empty_port_means_auto_detect() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 420_000;
        assert_invalid(&config, "baud_rate");
    }

    #[test]
    fn test_all_supported_baud_rates() {
        for baud_rate in SUPPORTED_BAUD_RATES {
            let mut config = create_valid_config();
            config.serial.baud_rate = baud_rate;
            assert!(config.validate().is_ok(), "{} should be accepted", baud_rate);
        }
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 0;
        assert_invalid(&config, "timeout_ms");

        config.serial.timeout_ms = 10001;
        assert_invalid(&config, "timeout_ms");
    }

    #[test]
    fn test_frame_gap_must_be_shorter_than_timeout() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 50;
        config.serial.frame_gap_ms = 50;
        assert_invalid(&config, "less than timeout_ms");

        config.serial.frame_gap_ms = 0;
        assert_invalid(&config, "frame_gap_ms");
    }

    #[test]
    fn test_slave_address_bounds() {
        let mut config = create_valid_config();
        config.servo.slave_address = 0;
        assert_invalid(&config, "slave_address");

        config.servo.slave_address = 248;
        assert_invalid(&config, "slave_address");

        config.servo.slave_address = 247;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_step_parameter_bounds() {
        let mut config = create_valid_config();
        config.servo.microsteps_per_step = 0;
        assert_invalid(&config, "microsteps_per_step");

        let mut config = create_valid_config();
        config.servo.steps_per_revolution = 0;
        assert_invalid(&config, "steps_per_revolution");
    }

    #[test]
    fn test_working_current_bounds() {
        let mut config = create_valid_config();
        config.setup.working_current_ma = 249;
        assert_invalid(&config, "working_current_ma");

        config.setup.working_current_ma = 3001;
        assert_invalid(&config, "working_current_ma");
    }

    #[test]
    fn test_hold_current_percent() {
        let mut config = create_valid_config();
        config.setup.hold_current_percent = 55;
        assert_invalid(&config, "hold_current_percent");

        config.setup.hold_current_percent = 0;
        assert_invalid(&config, "hold_current_percent");

        config.setup.hold_current_percent = 100;
        assert_eq!(config.setup_plan().unwrap().hold_current, HoldCurrent::Percent100);
    }

    #[test]
    fn test_link_settings() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 115_200;
        config.serial.frame_gap_ms = 5;

        let settings = config.link_settings();
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.timeout, Duration::from_millis(1000));
        assert_eq!(settings.frame_gap, Duration::from_millis(5));
    }

    #[test]
    fn test_setup_plan_from_config() {
        let plan = create_valid_config().setup_plan().unwrap();
        assert_eq!(plan, SetupPlan::default());
    }

    #[test]
    fn test_unknown_work_mode_rejected() {
        let result = Config::from_toml("[setup]\nwork_mode = \"SR_FAST\"\n");
        assert!(matches!(result, Err(ServoError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[serial]
port = "/dev/ttyACM0"
baud_rate = 115200
timeout_ms = 500
frame_gap_ms = 10

[servo]
slave_address = 3
microsteps_per_step = 32
steps_per_revolution = 400

[setup]
run_on_start = true
work_mode = "CR_vFOC"
working_current_ma = 1600
hold_current_percent = 70
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.servo.slave_address, 3);
        assert_eq!(config.servo.microsteps_per_step, 32);
        assert!(config.setup.run_on_start);
        assert_eq!(config.setup.work_mode, WorkMode::CrVfoc);
        assert_eq!(config.setup_plan().unwrap().hold_current, HoldCurrent::Percent70);
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[servo]\nslave_address = 0").unwrap();
        assert!(matches!(Config::load(file.path()), Err(ServoError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/servo42d.toml");
        assert!(matches!(result, Err(ServoError::Io(_))));
    }

    #[test]
    fn test_load_shipped_default_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.servo.slave_address, 1);
        assert_eq!(config.serial.baud_rate, 38_400);
    }
}
