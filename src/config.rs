//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, VarioError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which barometer backend feeds the hub
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Linux IIO sysfs device (bmp3xx / bmp280 kernel drivers)
    Iio,
    /// Synthetic thermal profile for bench testing
    Simulated,
}

/// Barometric sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    #[serde(default = "default_sensor_kind")]
    pub kind: SensorKind,

    #[serde(default = "default_iio_device")]
    pub iio_device: String,

    #[serde(default = "default_sea_level_pressure_hpa")]
    pub sea_level_pressure_hpa: f64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// Sampling loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_climb_window")]
    pub climb_window: usize,

    /// Per-sample spacing assumed by the climb rate estimator.
    /// Falls back to `interval_ms` when unset.
    #[serde(default)]
    pub climb_interval_ms: Option<u64>,
}

/// Session clock configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ClockConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Flight archive configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    #[serde(default = "default_archive_dir")]
    pub directory: String,
}

/// Viewer endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_file_logging")]
    pub file_logging: bool,
}

// Default value functions
fn default_sensor_kind() -> SensorKind { SensorKind::Iio }
fn default_iio_device() -> String { "/sys/bus/iio/devices/iio:device0".to_string() }
fn default_sea_level_pressure_hpa() -> f64 { 1013.25 }
fn default_read_timeout_ms() -> u64 { 1000 }

fn default_interval_ms() -> u64 { 2000 }
fn default_climb_window() -> usize { 5 }

fn default_timezone() -> String { "Europe/Belgrade".to_string() }

fn default_archive_dir() -> String { "./flights".to_string() }

fn default_bind() -> String { "0.0.0.0:5000".to_string() }
fn default_channel_capacity() -> usize { 64 }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_file_logging() -> bool { true }

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: default_sensor_kind(),
            iio_device: default_iio_device(),
            sea_level_pressure_hpa: default_sea_level_pressure_hpa(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            climb_window: default_climb_window(),
            climb_interval_ms: None,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { timezone: default_timezone() }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self { directory: default_archive_dir() }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            file_logging: default_file_logging(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            sampling: SamplingConfig::default(),
            clock: ClockConfig::default(),
            archive: ArchiveConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SamplingConfig {
    /// Delay between two sampling ticks
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Sample spacing used by the climb rate estimator, in seconds
    pub fn climb_interval_secs(&self) -> f64 {
        self.climb_interval_ms.unwrap_or(self.interval_ms) as f64 / 1000.0
    }
}

impl SensorConfig {
    /// Upper bound on a single sensor read
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
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
    /// use vario_station::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.sensor.kind == SensorKind::Iio && self.sensor.iio_device.is_empty() {
            return Err(invalid("sensor iio_device cannot be empty when kind = \"iio\""));
        }

        if !(800.0..=1200.0).contains(&self.sensor.sea_level_pressure_hpa) {
            return Err(invalid("sea_level_pressure_hpa must be between 800 and 1200"));
        }

        if self.sensor.read_timeout_ms == 0 || self.sensor.read_timeout_ms > 10000 {
            return Err(invalid("read_timeout_ms must be between 1 and 10000"));
        }

        if self.sampling.interval_ms < 100 || self.sampling.interval_ms > 60000 {
            return Err(invalid("interval_ms must be between 100 and 60000"));
        }

        if self.sampling.climb_window < 2 || self.sampling.climb_window > 60 {
            return Err(invalid("climb_window must be between 2 and 60"));
        }

        if let Some(ms) = self.sampling.climb_interval_ms {
            if ms == 0 || ms > 60000 {
                return Err(invalid("climb_interval_ms must be between 1 and 60000"));
            }
        }

        if self.clock.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(invalid(format!("unknown timezone '{}'", self.clock.timezone)));
        }

        if self.archive.directory.is_empty() {
            return Err(invalid("archive directory cannot be empty"));
        }

        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(invalid(format!("server bind '{}' is not a socket address", self.server.bind)));
        }

        if self.server.channel_capacity == 0 {
            return Err(invalid("channel_capacity must be greater than 0"));
        }

        if self.logging.file_logging && self.logging.log_dir.is_empty() {
            return Err(invalid("logging log_dir cannot be empty when file_logging is enabled"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> VarioError {
    VarioError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[sensor]
kind = "simulated"

[sampling]
interval_ms = 500

[clock]
timezone = "Europe/Vienna"

[archive]
directory = "/var/lib/vario/flights"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.sensor.kind, SensorKind::Simulated);
        assert_eq!(config.sampling.interval_ms, 500);
        assert_eq!(config.sampling.climb_window, 5);
        assert_eq!(config.clock.timezone, "Europe/Vienna");
        assert_eq!(config.archive.directory, "/var/lib/vario/flights");
        assert_eq!(config.server.bind, "0.0.0.0:5000");
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.sampling.interval_ms, 2000);
        assert_eq!(config.clock.timezone, "Europe/Belgrade");
    }

    #[test]
    fn test_load_invalid_file_fails_validation() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[sampling]\ninterval_ms = 0\n").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(VarioError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/vario/config.toml"),
            Err(VarioError::Io(_))
        ));
    }

    #[test]
    fn test_unknown_sensor_kind_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[sensor]\nkind = \"spi\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_iio_device() {
        let mut config = Config::default();
        config.sensor.iio_device = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_iio_device_when_simulated() {
        let mut config = Config::default();
        config.sensor.kind = SensorKind::Simulated;
        config.sensor.iio_device = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sea_level_pressure_out_of_range() {
        let mut config = Config::default();
        config.sensor.sea_level_pressure_hpa = 500.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_read_timeout_zero() {
        let mut config = Config::default();
        config.sensor.read_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interval_too_low() {
        let mut config = Config::default();
        config.sampling.interval_ms = 99;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interval_too_high() {
        let mut config = Config::default();
        config.sampling.interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_climb_window_too_small() {
        let mut config = Config::default();
        config.sampling.climb_window = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_climb_interval_zero() {
        let mut config = Config::default();
        config.sampling.climb_interval_ms = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_climb_interval_falls_back_to_sampling_interval() {
        let mut config = Config::default();
        assert_eq!(config.sampling.climb_interval_secs(), 2.0);

        config.sampling.climb_interval_ms = Some(500);
        assert_eq!(config.sampling.climb_interval_secs(), 0.5);
    }

    #[test]
    fn test_unknown_timezone() {
        let mut config = Config::default();
        config.clock.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_archive_dir() {
        let mut config = Config::default();
        config.archive.directory = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_bind_address() {
        let mut config = Config::default();
        config.server.bind = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_channel_capacity_zero() {
        let mut config = Config::default();
        config.server.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_file_logging() {
        let mut config = Config::default();
        config.logging.log_dir = String::new();
        assert!(config.validate().is_err());

        config.logging.file_logging = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_sensor_kind(), SensorKind::Iio);
        assert_eq!(default_iio_device(), "/sys/bus/iio/devices/iio:device0");
        assert_eq!(default_sea_level_pressure_hpa(), 1013.25);
        assert_eq!(default_read_timeout_ms(), 1000);
        assert_eq!(default_interval_ms(), 2000);
        assert_eq!(default_climb_window(), 5);
        assert_eq!(default_timezone(), "Europe/Belgrade");
        assert_eq!(default_archive_dir(), "./flights");
        assert_eq!(default_bind(), "0.0.0.0:5000");
        assert_eq!(default_channel_capacity(), 64);
        assert_eq!(default_log_dir(), "./logs");
        assert!(default_file_logging());
    }
}
