//! Configuration management for Helios
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. Every section has defaults, so a partial
//! file (or no file at all) yields a working setup for the common
//! 0665:5161 USB inverter.

use crate::error::{HeliosError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod defaults;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct Config {
    /// USB identity of the inverter
    pub device: DeviceConfig,

    /// Wire-protocol timing and retry budget
    pub protocol: ProtocolConfig,

    /// Minimum seconds between two full measurement cycles
    pub poll_interval_secs: u64,

    /// Amperes added to the reported charge current when it exceeds 1 A
    pub charge_current_bias: i64,

    /// Amperes added to the reported discharge current when it exceeds 1 A
    pub discharge_current_bias: i64,

    /// Measurement tag stamped on every snapshot (InfluxDB measurement name)
    pub measurement: String,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// USB HID identity of the inverter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct DeviceConfig {
    /// USB vendor id
    pub vendor_id: u16,

    /// USB product id
    pub product_id: u16,
}

/// Timing constants of the inverter protocol.
///
/// The defaults are what the device needs; lowering the inter-frame or
/// inter-read delays makes the USB link drop bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct ProtocolConfig {
    /// Pause between the two frames of a split command
    pub inter_frame_delay_ms: u64,

    /// Timeout of a single 8-byte packet read
    pub read_timeout_ms: u64,

    /// Wall-clock limit of the whole read-until-terminator loop
    pub read_deadline_ms: u64,

    /// Pause between consecutive packet reads
    pub inter_read_delay_ms: u64,

    /// Pause before resending a command whose reply was short
    pub retry_backoff_ms: u64,

    /// Attempts per command before the device is reported unreachable
    pub max_attempts: u32,

    /// Pending requests the device worker queues before callers wait
    pub queue_depth: usize,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file (its directory receives the rolling files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,

    /// Hex-dump every frame written and every reply read
    pub trace_frames: bool,
}

impl ProtocolConfig {
    pub fn inter_frame_delay(&self) -> Duration {
        Duration::from_millis(self.inter_frame_delay_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn read_deadline(&self) -> Duration {
        Duration::from_millis(self.read_deadline_ms)
    }

    pub fn inter_read_delay(&self) -> Duration {
        Duration::from_millis(self.inter_read_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "helios_config.yaml",
            "/data/helios_config.yaml",
            "/etc/helios/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.device.vendor_id == 0 {
            return Err(HeliosError::validation(
                "device.vendor_id",
                "Must be greater than 0",
            ));
        }

        if self.device.product_id == 0 {
            return Err(HeliosError::validation(
                "device.product_id",
                "Must be greater than 0",
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(HeliosError::validation(
                "poll_interval_secs",
                "Must be greater than 0",
            ));
        }

        if self.protocol.max_attempts == 0 {
            return Err(HeliosError::validation(
                "protocol.max_attempts",
                "Must be greater than 0",
            ));
        }

        if self.protocol.read_deadline_ms == 0 {
            return Err(HeliosError::validation(
                "protocol.read_deadline_ms",
                "Must be greater than 0",
            ));
        }

        if self.protocol.queue_depth == 0 {
            return Err(HeliosError::validation(
                "protocol.queue_depth",
                "Must be greater than 0",
            ));
        }

        if self.measurement.trim().is_empty() {
            return Err(HeliosError::validation(
                "measurement",
                "Measurement tag cannot be empty",
            ));
        }

        if self.web.port == 0 {
            return Err(HeliosError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.device.vendor_id, 0x0665);
        assert_eq!(config.device.product_id, 0x5161);
        assert_eq!(config.poll_interval_secs, 12);
        assert_eq!(config.charge_current_bias, 0);
        assert_eq!(config.discharge_current_bias, 1);
        assert_eq!(config.measurement, "exec_solar");
        assert_eq!(config.web.port, 8088);
        assert!(!config.logging.trace_frames);
    }

    #[test]
    fn test_protocol_defaults_are_device_timings() {
        let p = ProtocolConfig::default();
        assert_eq!(p.inter_frame_delay(), Duration::from_millis(350));
        assert_eq!(p.read_timeout(), Duration::from_millis(500));
        assert_eq!(p.read_deadline(), Duration::from_secs(7));
        assert_eq!(p.inter_read_delay(), Duration::from_millis(50));
        assert_eq!(p.retry_backoff(), Duration::from_secs(2));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.protocol.max_attempts = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.measurement = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "poll_interval_secs: 30\nweb:\n  port: 9000\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.web.port, 9000);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.protocol.max_attempts, 10);
    }
}
