//! Device registry and shared-transport arbiter for radio modules.
//!
//! This crate keeps track of the cellular, GNSS and short-range devices an
//! application has open, routes open/close requests to the right family
//! implementation, and shares physical I2C buses between the devices wired
//! to them.
//!
//! # Features
//!
//! - **Device registry**: `init`/`deinit`/`open`/`close` behind one lock
//! - **Handle validation**: stale and foreign [`DeviceHandle`]s are detected
//! - **Shared I2C buses**: a bus is opened once, reference counted per
//!   device, and closed when its last device goes away
//! - **Rollback**: a failed open leaves nothing acquired behind
//! - **Mock ports**: drive everything without hardware
//! - **TOML configuration**: table sizes, family switches, start-up devices
//!
//! # Architecture
//!
//! | Module | Role |
//! |--------|------|
//! | [`gate`] | The single, non-reentrant registry lock |
//! | [`store`] | Generation-checked device instances |
//! | [`arbiter`] | I2C bus and binding tables |
//! | [`family`] | Per-type `init`/`deinit`/`add`/`remove` |
//! | [`dispatcher`] | Routing by device type |
//! | [`registry`] | The [`DeviceRegistry`] facade |
//!
//! # Quick Start
//!
//! ```
//! use radiolink_core::mock::{MockI2cPort, MockUartPort};
//! use radiolink_core::{DeviceRegistry, RegistryConfig, status_code};
//! use radiolink_types::{DeviceConfig, DeviceType, I2cConfig, TransportConfig};
//!
//! let registry = DeviceRegistry::new(
//!     RegistryConfig::default(),
//!     MockI2cPort::new(),
//!     MockUartPort::new(),
//! );
//! registry.init().unwrap();
//!
//! let cfg = DeviceConfig::defaults(DeviceType::Gnss).with_transport(TransportConfig::I2c(
//!     I2cConfig {
//!         bus: 0,
//!         clock_hertz: 100_000,
//!         ..Default::default()
//!     },
//! ));
//! let a = registry.open(&cfg).unwrap();
//! let b = registry.open(&cfg).unwrap();
//! assert_eq!(registry.i2c_port_of(a), registry.i2c_port_of(b));
//! assert_eq!(registry.i2c_resource(0).unwrap().open_count, 2);
//!
//! assert_eq!(status_code(&registry.close(a, false)), 0);
//! registry.close(b, false).unwrap();
//! assert!(registry.i2c_resource(0).is_none());
//! ```

pub mod arbiter;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod family;
pub mod gate;
mod location;
pub mod mock;
pub mod port;
pub mod registry;
pub mod store;

pub use arbiter::{I2C_BINDING_CAPACITY_DEFAULT, I2C_RESOURCE_CAPACITY_DEFAULT, I2cArbiter, I2cResource};
pub use config::{CapacityConfig, ConfigError, FamilySwitches, RegistryConfig, ValidationError};
pub use dispatcher::{Dispatcher, Family};
pub use error::{Error, Result, status_code};
pub use family::{DeviceContext, DeviceFamily, Lifecycle, Resources};
pub use gate::{Gate, GateGuard};
pub use port::{I2cPort, PortHandle, UartPort};
pub use registry::DeviceRegistry;
pub use store::{DEVICE_CAPACITY_DEFAULT, DeviceInstance, DeviceStore};

// Re-export from radiolink-types
pub use radiolink_types::{DeviceConfig, DeviceHandle, DeviceType, ErrorCode, Subsystem};
