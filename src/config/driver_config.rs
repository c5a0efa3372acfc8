use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Root configuration struct expecting `[bus]` and `[driver]` tables
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DriverConfig {
    pub bus: BusEntry,
    #[serde(default)]
    pub driver: DriverEntry,
}

/// SPI bus the chip sits on
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BusEntry {
    pub path: String,
    #[serde(default = "default_speed_hz")]
    pub speed_hz: u32,
    #[serde(default = "default_mode")]
    pub mode: u8,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DriverEntry {
    /// Registry key for the running instance
    #[serde(default = "default_name")]
    pub name: String,
    /// Periodic sampling rate applied by `start`; manual polling when absent
    pub poll_rate_hz: Option<u32>,
    #[serde(default = "default_accel_topic")]
    pub accel_topic: String,
    #[serde(default = "default_gyro_topic")]
    pub gyro_topic: String,
}

impl Default for DriverEntry {
    fn default() -> Self {
        Self {
            name: default_name(),
            poll_rate_hz: None,
            accel_topic: default_accel_topic(),
            gyro_topic: default_gyro_topic(),
        }
    }
}

fn default_speed_hz() -> u32 {
    10_000_000
}

fn default_mode() -> u8 {
    3
}

fn default_name() -> String {
    "mpu6000".to_string()
}

fn default_accel_topic() -> String {
    "sensor_accel".to_string()
}

fn default_gyro_topic() -> String {
    "sensor_gyro".to_string()
}

impl DriverConfig {
    /// Configuration for a bus path with every other field defaulted
    pub fn for_bus(path: &str) -> Self {
        Self {
            bus: BusEntry {
                path: path.to_string(),
                speed_hz: default_speed_hz(),
                mode: default_mode(),
            },
            driver: DriverEntry::default(),
        }
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let parsed: DriverConfig = toml::from_str(content)?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.bus.mode > 3 {
            return Err(ConfigError::InvalidValue {
                field: "bus.mode".to_string(),
                reason: format!("SPI mode must be 0-3, got {}", self.bus.mode),
            });
        }
        if self.bus.speed_hz == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bus.speed_hz".to_string(),
                reason: "bus speed must be nonzero".to_string(),
            });
        }
        if self.driver.poll_rate_hz == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "driver.poll_rate_hz".to_string(),
                reason: "omit the field for manual polling instead of using 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads config from TOML file
pub fn load_driver_config(path: impl AsRef<Path>) -> ConfigResult<DriverConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.display().to_string(),
        source,
    })?;
    DriverConfig::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = DriverConfig::from_toml("[bus]\npath = \"/dev/spidev1.0\"\n").unwrap();
        assert_eq!(cfg.bus.path, "/dev/spidev1.0");
        assert_eq!(cfg.bus.speed_hz, 10_000_000);
        assert_eq!(cfg.bus.mode, 3);
        assert_eq!(cfg.driver.name, "mpu6000");
        assert_eq!(cfg.driver.poll_rate_hz, None);
        assert_eq!(cfg.driver.accel_topic, "sensor_accel");
        assert_eq!(cfg.driver.gyro_topic, "sensor_gyro");
    }

    #[test]
    fn test_full_config() {
        let cfg = DriverConfig::from_toml(
            r#"
            [bus]
            path = "/dev/spidev0.1"
            speed_hz = 1000000
            mode = 0

            [driver]
            name = "imu0"
            poll_rate_hz = 250
            accel_topic = "imu0_accel"
            gyro_topic = "imu0_gyro"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bus.speed_hz, 1_000_000);
        assert_eq!(cfg.bus.mode, 0);
        assert_eq!(cfg.driver.name, "imu0");
        assert_eq!(cfg.driver.poll_rate_hz, Some(250));
        assert_eq!(cfg.driver.gyro_topic, "imu0_gyro");
    }

    #[test]
    fn test_rejects_bad_mode_and_zero_rate() {
        let err = DriverConfig::from_toml("[bus]\npath = \"x\"\nmode = 4\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "bus.mode"));

        let err = DriverConfig::from_toml("[bus]\npath = \"x\"\n[driver]\npoll_rate_hz = 0\n")
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "driver.poll_rate_hz")
        );
    }

    #[test]
    fn test_missing_bus_is_format_error() {
        let err = DriverConfig::from_toml("[driver]\nname = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::FormatError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bus]\npath = \"/dev/spidev2.0\"").unwrap();
        let cfg = load_driver_config(file.path()).unwrap();
        assert_eq!(cfg.bus.path, "/dev/spidev2.0");

        let err = load_driver_config("/nonexistent/mpu6000.toml").unwrap_err();
        assert!(matches!(err, ConfigError::LoadError { .. }));
    }
}
