//! Shared types for the radiolink device registry.
//!
//! This crate holds the vocabulary every radiolink component speaks, without
//! any of the registry machinery:
//!
//! - [`ErrorCode`] and [`Subsystem`]: the signed status codes returned at the
//!   application boundary and the code ranges reserved per radio family
//! - [`DeviceType`] and [`DeviceHandle`]: what a device is and how the
//!   application refers to it
//! - [`DeviceConfig`]: the tagged union used to open a device
//!
//! # Example
//!
//! ```
//! use radiolink_types::{DeviceConfig, DeviceType, I2cConfig, TransportConfig};
//!
//! let cfg = DeviceConfig::defaults(DeviceType::Gnss).with_transport(TransportConfig::I2c(
//!     I2cConfig {
//!         bus: 0,
//!         clock_hertz: 100_000,
//!         ..Default::default()
//!     },
//! ));
//! assert_eq!(cfg.version, 0);
//! ```

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    CellConfig, DeviceConfig, DeviceTypeConfig, GNSS_I2C_ADDRESS_DEFAULT, GnssConfig, I2cConfig,
    PIN_NONE, ShortRangeConfig, TransportConfig, TransportType, UartConfig,
};
pub use error::{ErrorCode, Subsystem};
pub use types::{DeviceHandle, DeviceType};
