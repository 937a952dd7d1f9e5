//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section is optional; missing sections and fields fall back to the
//! defaults of the field deployment (3 s period, 5 min warm-up, GPS on
//! `/dev/serial0`, PM sensor on `/dev/ttyUSB0`, three MQ gas channels).

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LoggerError, Result};
use crate::sensors::ValidityPolicy;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub warmup: WarmupConfig,
    #[serde(default)]
    pub status_led: StatusLedConfig,
    #[serde(default)]
    pub gps: GpsConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub voc: VocConfig,
    #[serde(default)]
    pub co2: Co2Config,
    #[serde(default)]
    pub pm: PmConfig,
    #[serde(default)]
    pub imu: ImuConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Acquisition loop and output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AcquisitionConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_record_gps_time")]
    pub record_gps_time: bool,

    /// Add a `utc_ms` column holding the row timestamp as UTC epoch milliseconds
    #[serde(default)]
    pub record_utc_ms: bool,

    #[serde(default = "default_sensor_timeout_ms")]
    pub sensor_timeout_ms: u64,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Warm-up phase configuration
#[derive(Debug, Deserialize, Clone)]
pub struct WarmupConfig {
    #[serde(default = "default_warmup_duration_s")]
    pub duration_s: u64,

    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    #[serde(default = "default_interruptible")]
    pub interruptible: bool,
}

/// Status LED configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StatusLedConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_led_path")]
    pub path: PathBuf,

    #[serde(default = "default_active_low")]
    pub active_low: bool,

    #[serde(default = "default_blink_interval_ms")]
    pub blink_interval_ms: u64,
}

/// GPS receiver configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GpsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_gps_port")]
    pub port: String,

    #[serde(default = "default_gps_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,
}

/// Where a sensor's readings come from
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Linux industrial-I/O sysfs attributes
    Iio,
    /// Synthetic readings for bench runs without the chip attached
    Simulated,
}

/// One analog gas sensor wired to an ADC input
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct GasChannelConfig {
    pub name: String,
    pub input: u8,
}

/// Gas sensor array (MQ-series on an ADS1115) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GasConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_gas_backend")]
    pub backend: Backend,

    #[serde(default = "default_iio_device")]
    pub iio_device: PathBuf,

    #[serde(default = "default_circuit_voltage")]
    pub circuit_voltage: f64,

    #[serde(default = "default_load_resistance")]
    pub load_resistance: f64,

    #[serde(default = "default_gas_channels")]
    pub channels: Vec<GasChannelConfig>,
}

/// TVOC / eCO2 / AQI sensor configuration
///
/// Only a simulated backend exists, so the class is off unless enabled.
#[derive(Debug, Deserialize, Clone)]
pub struct VocConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Must be set to `simulated` explicitly; there is no hardware driver
    #[serde(default)]
    pub backend: Option<Backend>,

    #[serde(default)]
    pub validity: ValidityPolicy,
}

/// CO2 / temperature / humidity sensor configuration
///
/// Only a simulated backend exists, so the class is off unless enabled.
#[derive(Debug, Deserialize, Clone)]
pub struct Co2Config {
    #[serde(default)]
    pub enabled: bool,

    /// Must be set to `simulated` explicitly; there is no hardware driver
    #[serde(default)]
    pub backend: Option<Backend>,
}

/// Particulate matter sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PmConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_pm_port")]
    pub port: String,

    #[serde(default = "default_pm_baud_rate")]
    pub baud_rate: u32,
}

/// Inertial measurement unit configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ImuConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Must be set to `simulated` explicitly; there is no hardware driver
    #[serde(default)]
    pub backend: Option<Backend>,
}

/// Diagnostic log configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for a daily rolling diagnostic log; console only when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

// Default value functions
fn default_period_ms() -> u64 { 3000 }
fn default_output_dir() -> PathBuf { PathBuf::from(".") }
fn default_file_prefix() -> String { "sensor_log".to_string() }
fn default_record_gps_time() -> bool { true }
fn default_sensor_timeout_ms() -> u64 { 3000 }
fn default_settle_ms() -> u64 { 2000 }

fn default_warmup_duration_s() -> u64 { 300 }
fn default_progress_interval_ms() -> u64 { 1000 }
fn default_interruptible() -> bool { true }

fn default_led_path() -> PathBuf { PathBuf::from("/sys/class/leds/ACT/brightness") }
fn default_active_low() -> bool { true }
fn default_blink_interval_ms() -> u64 { 1000 }

fn default_enabled() -> bool { true }
fn default_gps_port() -> String { "/dev/serial0".to_string() }
fn default_gps_baud_rate() -> u32 { 9600 }
fn default_read_timeout_ms() -> u64 { 1000 }
fn default_poll_interval_ms() -> u64 { 50 }
fn default_stale_after_ms() -> u64 { 2000 }

fn default_gas_backend() -> Backend { Backend::Iio }
fn default_iio_device() -> PathBuf { PathBuf::from("/sys/bus/iio/devices/iio:device0") }
fn default_circuit_voltage() -> f64 { 5.0 }
fn default_load_resistance() -> f64 { 10_000.0 }
fn default_gas_channels() -> Vec<GasChannelConfig> {
    vec![
        GasChannelConfig { name: "mq3".to_string(), input: 0 },
        GasChannelConfig { name: "mq4".to_string(), input: 1 },
        GasChannelConfig { name: "mq8".to_string(), input: 3 },
    ]
}

fn default_pm_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_pm_baud_rate() -> u32 { 9600 }

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
            record_gps_time: default_record_gps_time(),
            record_utc_ms: false,
            sensor_timeout_ms: default_sensor_timeout_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            duration_s: default_warmup_duration_s(),
            progress_interval_ms: default_progress_interval_ms(),
            interruptible: default_interruptible(),
        }
    }
}

impl Default for StatusLedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_led_path(),
            active_low: default_active_low(),
            blink_interval_ms: default_blink_interval_ms(),
        }
    }
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            port: default_gps_port(),
            baud_rate: default_gps_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            stale_after_ms: default_stale_after_ms(),
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: default_gas_backend(),
            iio_device: default_iio_device(),
            circuit_voltage: default_circuit_voltage(),
            load_resistance: default_load_resistance(),
            channels: default_gas_channels(),
        }
    }
}

impl Default for VocConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: None,
            validity: ValidityPolicy::default(),
        }
    }
}

impl Default for Co2Config {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: None,
        }
    }
}

impl Default for PmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            port: default_pm_port(),
            baud_rate: default_pm_baud_rate(),
        }
    }
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: None,
        }
    }
}

impl AcquisitionConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl GpsConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

fn invalid(msg: impl std::fmt::Display) -> LoggerError {
    LoggerError::Config(toml::de::Error::custom(msg))
}

fn is_identifier(s: &str, allow_dash: bool) -> bool {
    !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_lowercase()
                || c.is_ascii_digit()
                || c == '_'
                || (allow_dash && (c == '-' || c.is_ascii_uppercase()))
        })
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
    /// use sensor_logger::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Enabled sensor classes that produce synthetic readings
    pub fn simulated_classes(&self) -> Vec<&'static str> {
        [
            ("gas", self.gas.enabled, Some(self.gas.backend)),
            ("voc", self.voc.enabled, self.voc.backend),
            ("co2", self.co2.enabled, self.co2.backend),
            ("imu", self.imu.enabled, self.imu.backend),
        ]
        .into_iter()
        .filter(|(_, enabled, backend)| *enabled && *backend == Some(Backend::Simulated))
        .map(|(name, _, _)| name)
        .collect()
    }

    /// Whether any sensor class is enabled
    pub fn any_sensor_enabled(&self) -> bool {
        self.gas.enabled || self.voc.enabled || self.co2.enabled || self.pm.enabled || self.imu.enabled
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Acquisition
        if self.acquisition.period_ms < 100 || self.acquisition.period_ms > 60_000 {
            return Err(invalid("period_ms must be between 100 and 60000"));
        }

        if self.acquisition.sensor_timeout_ms == 0 || self.acquisition.sensor_timeout_ms > 30_000 {
            return Err(invalid("sensor_timeout_ms must be between 1 and 30000"));
        }

        if self.acquisition.settle_ms > 60_000 {
            return Err(invalid("settle_ms must be at most 60000"));
        }

        if !is_identifier(&self.acquisition.file_prefix, true) {
            return Err(invalid("file_prefix may only contain letters, digits, '_' and '-'"));
        }

        if self.acquisition.output_dir.as_os_str().is_empty() {
            return Err(invalid("output_dir cannot be empty"));
        }

        // Warm-up and status LED
        if self.warmup.progress_interval_ms == 0 || self.warmup.progress_interval_ms > 60_000 {
            return Err(invalid("progress_interval_ms must be between 1 and 60000"));
        }

        if self.status_led.blink_interval_ms == 0 || self.status_led.blink_interval_ms > 10_000 {
            return Err(invalid("blink_interval_ms must be between 1 and 10000"));
        }

        if self.status_led.enabled && self.status_led.path.as_os_str().is_empty() {
            return Err(invalid("status_led path cannot be empty when enabled"));
        }

        // GPS
        if self.gps.enabled {
            if self.gps.port.is_empty() {
                return Err(invalid("gps port cannot be empty"));
            }

            if ![4800, 9600, 19200, 38400, 57600, 115200].contains(&self.gps.baud_rate) {
                return Err(invalid("gps baud_rate must be one of: 4800, 9600, 19200, 38400, 57600, 115200"));
            }

            if self.gps.read_timeout_ms == 0 || self.gps.read_timeout_ms > 10_000 {
                return Err(invalid("gps read_timeout_ms must be between 1 and 10000"));
            }

            if self.gps.poll_interval_ms == 0 || self.gps.poll_interval_ms > 1000 {
                return Err(invalid("gps poll_interval_ms must be between 1 and 1000"));
            }

            if self.gps.stale_after_ms == 0 {
                return Err(invalid("gps stale_after_ms must be greater than 0"));
            }
        }

        if !self.any_sensor_enabled() {
            return Err(invalid("at least one sensor class must be enabled"));
        }

        // Gas array
        if self.gas.enabled {
            if self.gas.channels.is_empty() {
                return Err(invalid("gas sensor enabled but no channels configured"));
            }

            for (idx, channel) in self.gas.channels.iter().enumerate() {
                if !is_identifier(&channel.name, false) {
                    return Err(invalid(format!(
                        "gas channel name '{}' may only contain lowercase letters, digits and '_'",
                        channel.name
                    )));
                }

                if channel.input > 3 {
                    return Err(invalid(format!(
                        "gas channel '{}' input {} is out of bounds (must be 0-3)",
                        channel.name, channel.input
                    )));
                }

                if self.gas.channels[..idx].iter().any(|c| c.name == channel.name) {
                    return Err(invalid(format!("duplicate gas channel name '{}'", channel.name)));
                }
            }

            if self.gas.circuit_voltage.is_nan() || self.gas.circuit_voltage <= 0.0 {
                return Err(invalid("circuit_voltage must be greater than 0"));
            }

            if self.gas.load_resistance.is_nan() || self.gas.load_resistance <= 0.0 {
                return Err(invalid("load_resistance must be greater than 0"));
            }
        }

        // Only the gas array has an IIO driver; the rest must opt in to synthetic data
        for (name, enabled, backend) in [
            ("voc", self.voc.enabled, self.voc.backend),
            ("co2", self.co2.enabled, self.co2.backend),
            ("imu", self.imu.enabled, self.imu.backend),
        ] {
            match backend {
                _ if !enabled => {}
                Some(Backend::Simulated) => {}
                Some(Backend::Iio) => {
                    return Err(invalid(format!("{} sensor has no iio backend", name)));
                }
                None => {
                    return Err(invalid(format!(
                        "{} sensor has no hardware backend; set backend = \"simulated\" to record synthetic values",
                        name
                    )));
                }
            }
        }

        // PM sensor
        if self.pm.enabled {
            if self.pm.port.is_empty() {
                return Err(invalid("pm port cannot be empty"));
            }

            if self.pm.baud_rate != 9600 {
                return Err(invalid("pm baud_rate must be 9600"));
            }
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
        let config = create_valid_config();
        assert!(config.validate().is_ok());
        assert!(!config.voc.enabled);
        assert!(!config.co2.enabled);
        assert!(config.simulated_classes().is_empty());
    }

    #[test]
    fn test_simulated_classes_listed_when_enabled() {
        let mut config = create_valid_config();
        config.gas.backend = Backend::Simulated;
        config.co2.enabled = true;
        config.co2.backend = Some(Backend::Simulated);
        assert_eq!(config.simulated_classes(), vec!["gas", "co2"]);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[acquisition]
period_ms = 1000
output_dir = "/tmp/logs"

[gps]
port = "/dev/ttyAMA0"

[gas]
backend = "simulated"
channels = [
    { name = "mq3", input = 0 },
    { name = "mq135", input = 2 },
]

[voc]
validity = "legacy"

[imu]
enabled = true
backend = "simulated"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.acquisition.period(), Duration::from_millis(1000));
        assert_eq!(config.acquisition.output_dir, PathBuf::from("/tmp/logs"));
        assert_eq!(config.gps.port, "/dev/ttyAMA0");
        assert_eq!(config.gas.backend, Backend::Simulated);
        assert_eq!(config.gas.channels.len(), 2);
        assert_eq!(config.gas.channels[1].name, "mq135");
        assert_eq!(config.voc.validity, ValidityPolicy::Legacy);
        assert!(config.imu.enabled);
        assert!(config.pm.enabled);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.acquisition.period_ms, 3000);
        assert_eq!(config.warmup.duration_s, 300);
        assert_eq!(config.gas.channels, default_gas_channels());
        assert_eq!(config.voc.validity, ValidityPolicy::Strict);
        assert!(!config.imu.enabled);
        assert!(!config.voc.enabled);
        assert!(!config.co2.enabled);
        assert!(config.simulated_classes().is_empty());
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = Config::from_toml("[gas]\nbackend = \"spi\"\n");
        assert!(matches!(result, Err(LoggerError::Config(_))));
    }

    #[test]
    fn test_period_too_short() {
        let mut config = create_valid_config();
        config.acquisition.period_ms = 99;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_period_too_long() {
        let mut config = create_valid_config();
        config.acquisition.period_ms = 60_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sensor_timeout_zero() {
        let mut config = create_valid_config();
        config.acquisition.sensor_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_prefix_with_separator() {
        let mut config = create_valid_config();
        config.acquisition.file_prefix = "../escape".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_prefix_mixed_case_allowed() {
        let mut config = create_valid_config();
        config.acquisition.file_prefix = "Backpack-Run_2".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_progress_interval_zero() {
        let mut config = create_valid_config();
        config.warmup.progress_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_warmup_allowed() {
        let mut config = create_valid_config();
        config.warmup.duration_s = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blink_interval_zero() {
        let mut config = create_valid_config();
        config.status_led.blink_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_gps_port() {
        let mut config = create_valid_config();
        config.gps.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_gps_port_when_disabled() {
        let mut config = create_valid_config();
        config.gps.enabled = false;
        config.gps.port = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_gps_baud_rate() {
        let mut config = create_valid_config();
        config.gps.baud_rate = 420_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_gps_baud_rates() {
        for &baud in &[4800, 9600, 19200, 38400, 57600, 115200] {
            let mut config = create_valid_config();
            config.gps.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_gps_poll_interval_too_high() {
        let mut config = create_valid_config();
        config.gps.poll_interval_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_sensor_enabled() {
        let mut config = create_valid_config();
        config.gas.enabled = false;
        config.voc.enabled = false;
        config.co2.enabled = false;
        config.pm.enabled = false;
        config.imu.enabled = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gas_without_channels() {
        let mut config = create_valid_config();
        config.gas.channels.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gas_channel_input_out_of_range() {
        let mut config = create_valid_config();
        config.gas.channels.push(GasChannelConfig { name: "mq7".to_string(), input: 4 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_gas_channel_name() {
        let mut config = create_valid_config();
        config.gas.channels.push(GasChannelConfig { name: "mq3".to_string(), input: 2 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gas_channel_name_with_comma() {
        let mut config = create_valid_config();
        config.gas.channels[0].name = "mq,3".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_circuit_voltage_zero() {
        let mut config = create_valid_config();
        config.gas.circuit_voltage = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_resistance_nan() {
        let mut config = create_valid_config();
        config.gas.load_resistance = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_iio_backend_only_for_gas() {
        let mut config = create_valid_config();
        config.co2.enabled = true;
        config.co2.backend = Some(Backend::Iio);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_enabled_without_backend_rejected() {
        let result = Config::from_toml("[voc]\nenabled = true\n");
        assert!(matches!(result, Err(LoggerError::Config(_))));

        let config = Config::from_toml("[voc]\nenabled = true\nbackend = \"simulated\"\n").unwrap();
        assert_eq!(config.voc.backend, Some(Backend::Simulated));
        assert!(config.simulated_classes().contains(&"voc"));
    }

    #[test]
    fn test_pm_baud_rate_fixed() {
        let mut config = create_valid_config();
        config.pm.baud_rate = 115200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_period_ms(), 3000);
        assert_eq!(default_file_prefix(), "sensor_log");
        assert_eq!(default_settle_ms(), 2000);
        assert_eq!(default_warmup_duration_s(), 300);
        assert_eq!(default_led_path(), PathBuf::from("/sys/class/leds/ACT/brightness"));
        assert_eq!(default_gps_port(), "/dev/serial0");
        assert_eq!(default_gps_baud_rate(), 9600);
        assert_eq!(default_stale_after_ms(), 2000);
        assert_eq!(default_circuit_voltage(), 5.0);
        assert_eq!(default_load_resistance(), 10_000.0);
        assert_eq!(default_pm_port(), "/dev/ttyUSB0");
        assert_eq!(default_pm_baud_rate(), 9600);
    }
}
