//! Registry configuration.
//!
//! A [`RegistryConfig`] sizes the registry's fixed tables, switches radio
//! families on or off, and may declare devices to open at start-up. It is
//! usually loaded from a TOML file:
//!
//! ```toml
//! [capacity]
//! devices = 8
//! i2c_resources = 2
//!
//! [families]
//! short_range_open_cpu = false
//!
//! [[devices]]
//! device_type = "gnss"
//! transport = { type = "i2c", bus = 0, clock_hertz = 100000 }
//! device = { family = "gnss" }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use radiolink_types::{DeviceConfig, DeviceType, TransportConfig};

use crate::arbiter::{I2C_BINDING_CAPACITY_DEFAULT, I2C_RESOURCE_CAPACITY_DEFAULT};
use crate::store::DEVICE_CAPACITY_DEFAULT;

/// Registry configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Table sizes.
    pub capacity: CapacityConfig,
    /// Which radio families this build carries.
    pub families: FamilySwitches,
    /// Devices to open with [`DeviceRegistry::open_configured`](crate::DeviceRegistry::open_configured).
    pub devices: Vec<DeviceConfig>,
}

impl RegistryConfig {
    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Every capacity is non-zero
    /// - Declared devices use version `0` and settings matching their type
    /// - Declared devices belong to an enabled family
    /// - I2C bus numbers and clocks are not negative
    /// - No declared device uses an AT transport (its host handle cannot
    ///   exist before the registry runs)
    ///
    /// # Example
    ///
    /// ```
    /// use radiolink_core::RegistryConfig;
    ///
    /// let config = RegistryConfig::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = self.capacity.validate();

        for (i, device) in self.devices.iter().enumerate() {
            let prefix = format!("devices[{}]", i);
            errors.extend(validate_device(device, &prefix));
            if !self.families.enabled(device.device_type) {
                errors.push(ValidationError {
                    field: format!("{}.device_type", prefix),
                    message: format!("{} family is disabled", device.device_type),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

fn validate_device(device: &DeviceConfig, prefix: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if device.version != 0 {
        errors.push(ValidationError {
            field: format!("{}.version", prefix),
            message: format!("unsupported version {}, expected 0", device.version),
        });
    }
    if !device.device.fits(device.device_type) {
        errors.push(ValidationError {
            field: format!("{}.device", prefix),
            message: format!("settings do not match device type {}", device.device_type),
        });
    }

    match &device.transport {
        TransportConfig::I2c(i2c) => {
            if i2c.bus < 0 {
                errors.push(ValidationError {
                    field: format!("{}.transport.bus", prefix),
                    message: format!("bus must not be negative, got {}", i2c.bus),
                });
            }
            if i2c.clock_hertz < 0 {
                errors.push(ValidationError {
                    field: format!("{}.transport.clock_hertz", prefix),
                    message: format!("clock must not be negative, got {}", i2c.clock_hertz),
                });
            }
        }
        TransportConfig::At { .. } => errors.push(ValidationError {
            field: format!("{}.transport", prefix),
            message: "AT transport needs a host opened at runtime".to_string(),
        }),
        TransportConfig::None | TransportConfig::Uart(_) => {}
    }

    errors
}

/// Fixed table sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Devices open at once.
    pub devices: usize,
    /// Distinct I2C buses open at once.
    pub i2c_resources: usize,
    /// Device-to-bus bindings.
    pub i2c_bindings: usize,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            devices: DEVICE_CAPACITY_DEFAULT,
            i2c_resources: I2C_RESOURCE_CAPACITY_DEFAULT,
            i2c_bindings: I2C_BINDING_CAPACITY_DEFAULT,
        }
    }
}

impl CapacityConfig {
    /// Validate table sizes.
    pub fn validate(&self) -> Vec<ValidationError> {
        [
            ("capacity.devices", self.devices),
            ("capacity.i2c_resources", self.i2c_resources),
            ("capacity.i2c_bindings", self.i2c_bindings),
        ]
        .into_iter()
        .filter(|(_, value)| *value == 0)
        .map(|(field, _)| ValidationError {
            field: field.to_string(),
            message: "capacity must be at least 1".to_string(),
        })
        .collect()
    }
}

/// Radio families present in this build.
///
/// A switched-off family answers `init` with `NotImplemented`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilySwitches {
    /// Cellular.
    pub cell: bool,
    /// GNSS.
    pub gnss: bool,
    /// Short-range.
    pub short_range: bool,
    /// Short-range open CPU.
    pub short_range_open_cpu: bool,
}

impl Default for FamilySwitches {
    fn default() -> Self {
        Self {
            cell: true,
            gnss: true,
            short_range: true,
            short_range_open_cpu: true,
        }
    }
}

impl FamilySwitches {
    /// Whether `device_type`'s family is switched on.
    pub fn enabled(&self, device_type: DeviceType) -> bool {
        match device_type {
            DeviceType::Cell => self.cell,
            DeviceType::Gnss => self.gnss,
            DeviceType::ShortRange => self.short_range,
            DeviceType::ShortRangeOpenCpu => self.short_range_open_cpu,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `capacity.devices` or `devices[0].version`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use radiolink_types::{DeviceHandle, DeviceTypeConfig, I2cConfig, ShortRangeConfig};

    use super::*;

    fn fields(result: Result<(), ConfigError>) -> Vec<String> {
        match result {
            Err(ConfigError::Validation(errors)) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_config_default() {
        let config = RegistryConfig::default();
        assert_eq!(config.capacity.devices, 16);
        assert_eq!(config.capacity.i2c_resources, 4);
        assert_eq!(config.capacity.i2c_bindings, 10);
        assert!(DeviceType::ALL.iter().all(|ty| config.families.enabled(*ty)));
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_default_config_validates() {
        assert!(RegistryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [capacity]
            devices = 8
            i2c_resources = 2

            [families]
            short_range_open_cpu = false

            [[devices]]
            device_type = "gnss"
            transport = { type = "i2c", bus = 0, clock_hertz = 100000 }
            device = { family = "gnss" }

            [[devices]]
            device_type = "cell"
            transport = { type = "uart", uart = 1, baud_rate = 921600 }
            device = { family = "cell", module_type = 2, sim_pin_code = "1234" }
        "#;
        let config: RegistryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.capacity.devices, 8);
        assert_eq!(config.capacity.i2c_resources, 2);
        assert_eq!(config.capacity.i2c_bindings, 10);
        assert!(!config.families.short_range_open_cpu);
        assert!(config.families.gnss);
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[1].module_type(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("registry.toml");

        let config = RegistryConfig {
            capacity: CapacityConfig {
                devices: 4,
                ..Default::default()
            },
            families: FamilySwitches {
                cell: false,
                ..Default::default()
            },
            devices: vec![DeviceConfig::defaults(DeviceType::Gnss).with_transport(
                TransportConfig::I2c(I2cConfig {
                    bus: 1,
                    clock_hertz: 400_000,
                    ..Default::default()
                }),
            )],
        };

        config.save(&config_path).unwrap();
        let loaded = RegistryConfig::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = RegistryConfig::load("/nonexistent/path/registry.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = RegistryConfig::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_validated_rejects_zero_capacity() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("zero.toml");
        std::fs::write(&config_path, "[capacity]\ni2c_bindings = 0\n").unwrap();

        assert!(RegistryConfig::load(&config_path).is_ok());
        let result = RegistryConfig::load_validated(&config_path);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_capacity_validation() {
        let config = RegistryConfig {
            capacity: CapacityConfig {
                devices: 0,
                i2c_resources: 0,
                i2c_bindings: 3,
            },
            ..Default::default()
        };
        assert_eq!(
            fields(config.validate()),
            vec!["capacity.devices", "capacity.i2c_resources"]
        );
    }

    #[test]
    fn test_device_validation() {
        let mut bad_version = DeviceConfig::defaults(DeviceType::Cell);
        bad_version.version = 1;
        let mut mismatched = DeviceConfig::defaults(DeviceType::Cell);
        mismatched.device = DeviceTypeConfig::ShortRange(ShortRangeConfig::default());
        let negative_bus = DeviceConfig::defaults(DeviceType::Gnss).with_transport(
            TransportConfig::I2c(I2cConfig {
                bus: -1,
                ..Default::default()
            }),
        );
        let at = DeviceConfig::defaults(DeviceType::Gnss).with_transport(TransportConfig::At {
            host: DeviceHandle::from_parts(1, 0, 0),
        });

        let config = RegistryConfig {
            devices: vec![bad_version, mismatched, negative_bus, at],
            ..Default::default()
        };
        assert_eq!(
            fields(config.validate()),
            vec![
                "devices[0].version",
                "devices[1].device",
                "devices[2].transport.bus",
                "devices[3].transport",
            ]
        );
    }

    #[test]
    fn test_disabled_family_device_rejected() {
        let config = RegistryConfig {
            families: FamilySwitches {
                gnss: false,
                ..Default::default()
            },
            devices: vec![DeviceConfig::defaults(DeviceType::Gnss)],
            ..Default::default()
        };
        assert_eq!(fields(config.validate()), vec!["devices[0].device_type"]);
    }

    #[test]
    fn test_validation_error_display() {
        let error = ConfigError::Validation(vec![ValidationError {
            field: "capacity.devices".to_string(),
            message: "capacity must be at least 1".to_string(),
        }]);
        let display = error.to_string();
        assert!(display.contains("Configuration validation failed"));
        assert!(display.contains("  - capacity.devices: capacity must be at least 1"));
    }
}
