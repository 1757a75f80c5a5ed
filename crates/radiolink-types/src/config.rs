//! Device open configuration.
//!
//! [`DeviceConfig`] is the tagged union an application hands to the registry
//! when opening a device: which family, how it is physically attached, and
//! the per-family settings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{DeviceHandle, DeviceType};

/// Pin value meaning "not connected".
pub const PIN_NONE: i32 = -1;

/// Default I2C address of a GNSS receiver.
pub const GNSS_I2C_ADDRESS_DEFAULT: u16 = 0x42;

/// UART settings for a single-owner serial link.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UartConfig {
    /// UART peripheral number.
    pub uart: i32,
    /// Baud rate.
    pub baud_rate: u32,
    /// TXD pin.
    pub pin_txd: i32,
    /// RXD pin.
    pub pin_rxd: i32,
    /// CTS pin, [`PIN_NONE`] when flow control is off.
    pub pin_cts: i32,
    /// RTS pin, [`PIN_NONE`] when flow control is off.
    pub pin_rts: i32,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            uart: 0,
            baud_rate: 115_200,
            pin_txd: PIN_NONE,
            pin_rxd: PIN_NONE,
            pin_cts: PIN_NONE,
            pin_rts: PIN_NONE,
        }
    }
}

/// I2C bus settings.
///
/// Several devices may name the same `bus`; the registry opens the bus once
/// and shares the port between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct I2cConfig {
    /// I2C hardware block number.
    pub bus: i32,
    /// SDA pin.
    pub pin_sda: i32,
    /// SCL pin.
    pub pin_scl: i32,
    /// Clock frequency to apply after opening, `0` keeps the driver default.
    pub clock_hertz: i32,
    /// The application has already opened the bus; adopt it instead of
    /// initialising the hardware again.
    pub already_open: bool,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            bus: 0,
            pin_sda: PIN_NONE,
            pin_scl: PIN_NONE,
            clock_hertz: 0,
            already_open: false,
        }
    }
}

/// Discriminant of [`TransportConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// No transport.
    None,
    /// UART.
    Uart,
    /// I2C.
    I2c,
    /// AT commands relayed through another device.
    At,
}

/// How a device is physically attached.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum TransportConfig {
    /// Nothing attached.
    #[default]
    None,
    /// Dedicated UART.
    Uart(UartConfig),
    /// Shared I2C bus.
    I2c(I2cConfig),
    /// AT interface of an already-open cellular or short-range device.
    At {
        /// The device whose AT client carries the traffic.
        host: DeviceHandle,
    },
}

impl TransportConfig {
    /// The transport discriminant.
    #[must_use]
    pub fn kind(&self) -> TransportType {
        match self {
            TransportConfig::None => TransportType::None,
            TransportConfig::Uart(_) => TransportType::Uart,
            TransportConfig::I2c(_) => TransportType::I2c,
            TransportConfig::At { .. } => TransportType::At,
        }
    }
}

/// Cellular module settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CellConfig {
    /// Cellular module type.
    pub module_type: i32,
    /// SIM PIN, if the SIM needs one.
    pub sim_pin_code: Option<String>,
    /// Pin that switches module power.
    pub pin_enable_power: i32,
    /// Pin wired to the module's PWR_ON input.
    pub pin_pwr_on: i32,
    /// Pin wired to the module's VINT output.
    pub pin_vint: i32,
    /// Pin wired to DTR for power saving.
    pub pin_dtr_power_saving: i32,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            module_type: 0,
            sim_pin_code: None,
            pin_enable_power: PIN_NONE,
            pin_pwr_on: PIN_NONE,
            pin_vint: PIN_NONE,
            pin_dtr_power_saving: PIN_NONE,
        }
    }
}

/// GNSS receiver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GnssConfig {
    /// GNSS module type.
    pub module_type: i32,
    /// Pin that switches receiver power.
    pub pin_enable_power: i32,
    /// I2C address when attached over I2C.
    pub i2c_address: u16,
    /// Data-ready pin.
    pub pin_data_ready: i32,
}

impl Default for GnssConfig {
    fn default() -> Self {
        Self {
            module_type: 0,
            pin_enable_power: PIN_NONE,
            i2c_address: GNSS_I2C_ADDRESS_DEFAULT,
            pin_data_ready: PIN_NONE,
        }
    }
}

/// Short-range module settings, shared by both short-range device types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ShortRangeConfig {
    /// Short-range module type.
    pub module_type: i32,
}

/// Per-family device settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "family", rename_all = "snake_case"))]
pub enum DeviceTypeConfig {
    /// Cellular settings.
    Cell(CellConfig),
    /// GNSS settings.
    Gnss(GnssConfig),
    /// Short-range settings (both short-range device types).
    ShortRange(ShortRangeConfig),
}

impl DeviceTypeConfig {
    /// Module type carried by the settings.
    #[must_use]
    pub fn module_type(&self) -> i32 {
        match self {
            DeviceTypeConfig::Cell(cfg) => cfg.module_type,
            DeviceTypeConfig::Gnss(cfg) => cfg.module_type,
            DeviceTypeConfig::ShortRange(cfg) => cfg.module_type,
        }
    }

    /// Returns `true` if these settings may be used with `device_type`.
    #[must_use]
    pub fn fits(&self, device_type: DeviceType) -> bool {
        match self {
            DeviceTypeConfig::Cell(_) => device_type == DeviceType::Cell,
            DeviceTypeConfig::Gnss(_) => device_type == DeviceType::Gnss,
            DeviceTypeConfig::ShortRange(_) => device_type.is_short_range(),
        }
    }
}

/// Everything needed to open one device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    /// Structure version, must be `0`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub version: u8,
    /// Device family.
    pub device_type: DeviceType,
    /// Physical attachment.
    #[cfg_attr(feature = "serde", serde(default))]
    pub transport: TransportConfig,
    /// Per-family settings; must match `device_type`.
    pub device: DeviceTypeConfig,
}

impl DeviceConfig {
    /// A reasonable starting configuration for `device_type`.
    ///
    /// Cellular and short-range devices default to UART 0, GNSS to I2C bus 0.
    ///
    /// ```
    /// use radiolink_types::{DeviceConfig, DeviceType, TransportType};
    ///
    /// let cfg = DeviceConfig::defaults(DeviceType::Gnss);
    /// assert_eq!(cfg.version, 0);
    /// assert_eq!(cfg.transport.kind(), TransportType::I2c);
    /// assert!(cfg.device.fits(DeviceType::Gnss));
    /// ```
    #[must_use]
    pub fn defaults(device_type: DeviceType) -> Self {
        let (transport, device) = match device_type {
            DeviceType::Cell => (
                TransportConfig::Uart(UartConfig::default()),
                DeviceTypeConfig::Cell(CellConfig::default()),
            ),
            DeviceType::Gnss => (
                TransportConfig::I2c(I2cConfig::default()),
                DeviceTypeConfig::Gnss(GnssConfig::default()),
            ),
            DeviceType::ShortRange | DeviceType::ShortRangeOpenCpu => (
                TransportConfig::Uart(UartConfig::default()),
                DeviceTypeConfig::ShortRange(ShortRangeConfig::default()),
            ),
        };
        Self {
            version: 0,
            device_type,
            transport,
            device,
        }
    }

    /// Replace the transport, builder style.
    #[must_use]
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Module type from the per-family settings.
    #[must_use]
    pub fn module_type(&self) -> i32 {
        self.device.module_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fit_their_type() {
        for ty in DeviceType::ALL {
            let cfg = DeviceConfig::defaults(ty);
            assert!(cfg.device.fits(ty), "{ty} defaults do not fit");
            assert_eq!(cfg.device_type, ty);
        }
    }

    #[test]
    fn test_short_range_settings_fit_both_variants() {
        let device = DeviceTypeConfig::ShortRange(ShortRangeConfig::default());
        assert!(device.fits(DeviceType::ShortRange));
        assert!(device.fits(DeviceType::ShortRangeOpenCpu));
        assert!(!device.fits(DeviceType::Cell));
    }

    #[test]
    fn test_with_transport() {
        let cfg = DeviceConfig::defaults(DeviceType::Gnss).with_transport(TransportConfig::None);
        assert_eq!(cfg.transport.kind(), TransportType::None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_device_config_from_toml() {
        let text = r#"
            device_type = "gnss"

            [transport]
            type = "i2c"
            bus = 1
            clock_hertz = 100000

            [device]
            family = "gnss"
            module_type = 3
        "#;
        let cfg: DeviceConfig = toml::from_str(text).unwrap();
        assert_eq!(cfg.version, 0);
        assert_eq!(cfg.device_type, DeviceType::Gnss);
        assert_eq!(cfg.module_type(), 3);
        match cfg.transport {
            TransportConfig::I2c(i2c) => {
                assert_eq!(i2c.bus, 1);
                assert_eq!(i2c.clock_hertz, 100_000);
                assert_eq!(i2c.pin_sda, PIN_NONE);
                assert!(!i2c.already_open);
            }
            other => panic!("unexpected transport {other:?}"),
        }
        match cfg.device {
            DeviceTypeConfig::Gnss(gnss) => assert_eq!(gnss.i2c_address, GNSS_I2C_ADDRESS_DEFAULT),
            other => panic!("unexpected settings {other:?}"),
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_missing_transport_defaults_to_none() {
        let text = r#"
            device_type = "short_range_open_cpu"

            [device]
            family = "short_range"
        "#;
        let cfg: DeviceConfig = toml::from_str(text).unwrap();
        assert_eq!(cfg.transport, TransportConfig::None);
        assert!(cfg.device.fits(cfg.device_type));
    }
}
