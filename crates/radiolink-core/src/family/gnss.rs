//! GNSS family.
//!
//! A GNSS receiver may sit on its own UART, share an I2C bus with other
//! devices, or be reached through the AT interface of an already-open
//! cellular or short-range module. Shared I2C buses go through the
//! [`I2cArbiter`](crate::arbiter::I2cArbiter) so the bus is opened once and
//! closed when its last user leaves.

use tracing::{info, warn};

use radiolink_types::{DeviceConfig, DeviceHandle, DeviceType, DeviceTypeConfig, TransportConfig};

use super::{
    DeviceContext, DeviceFamily, FamilyState, Lifecycle, Resources, check_config, close_all,
    instance_of,
};
use crate::error::{Error, Result};
use crate::port::PortHandle;

/// How an open GNSS device is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GnssTransport {
    /// Dedicated UART.
    Uart(PortHandle),
    /// Shared I2C bus, reference held in the arbiter.
    I2c {
        /// Bus number.
        bus: i32,
        /// Port handle shared by every device on the bus.
        port: PortHandle,
    },
    /// AT commands relayed through `host`.
    At {
        /// Device carrying the AT traffic.
        host: DeviceHandle,
    },
}

/// State kept for an open GNSS device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GnssContext {
    /// Attachment.
    pub transport: GnssTransport,
    /// I2C address of the receiver.
    pub i2c_address: u16,
}

/// GNSS receivers.
#[derive(Debug)]
pub struct GnssFamily {
    state: FamilyState,
}

impl GnssFamily {
    /// Create the family; `enabled = false` models a build without GNSS.
    pub fn new(enabled: bool) -> Self {
        Self {
            state: FamilyState::new(DeviceType::Gnss, enabled),
        }
    }

    fn close(handle: DeviceHandle, power_off: bool, res: &mut Resources<'_>) -> Result<()> {
        let context = match instance_of(res.store, DeviceType::Gnss, handle)?.context {
            DeviceContext::Gnss(context) => context,
            _ => return Err(Error::InvalidParameter),
        };
        if power_off {
            info!("Powering off GNSS receiver {}", handle);
        }
        match context.transport {
            GnssTransport::Uart(uart) => res.uart.close(uart),
            GnssTransport::I2c { bus, .. } => {
                if let Err(err) = res.arbiter.release_by_device(res.i2c, handle) {
                    warn!("GNSS device {} held no binding on I2C bus {}: {}", handle, bus, err);
                }
            }
            GnssTransport::At { .. } => {}
        }
        res.store.destroy(handle);
        info!("Closed GNSS device {}", handle);
        Ok(())
    }

    /// Open or borrow the transport a new device will use.
    fn attach(config: &DeviceConfig, res: &mut Resources<'_>) -> Result<GnssTransport> {
        match &config.transport {
            TransportConfig::Uart(uart_config) => Ok(GnssTransport::Uart(res.uart.open(uart_config)?)),
            TransportConfig::I2c(i2c_config) => {
                let port = res.arbiter.acquire_bus(res.i2c, i2c_config)?;
                Ok(GnssTransport::I2c {
                    bus: i2c_config.bus,
                    port,
                })
            }
            TransportConfig::At { host } => {
                let host_type = res.store.device_type(*host)?;
                if !host_type.has_at_client() {
                    warn!("{} device {} has no AT interface for GNSS", host_type, host);
                    return Err(Error::InvalidParameter);
                }
                Ok(GnssTransport::At { host: *host })
            }
            TransportConfig::None => Err(Error::InvalidParameter),
        }
    }

    /// Undo [`Self::attach`].
    fn detach(transport: GnssTransport, res: &mut Resources<'_>) {
        match transport {
            GnssTransport::Uart(uart) => res.uart.close(uart),
            GnssTransport::I2c { bus, .. } => {
                if let Err(err) = res.arbiter.release_by_bus(res.i2c, bus) {
                    warn!("Releasing I2C bus {} after failed open: {}", bus, err);
                }
            }
            GnssTransport::At { .. } => {}
        }
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut FamilyState {
        &mut self.state
    }
}

impl DeviceFamily for GnssFamily {
    fn device_type(&self) -> DeviceType {
        DeviceType::Gnss
    }

    fn init(&mut self) -> Result<()> {
        self.state.init()
    }

    fn deinit(&mut self, res: &mut Resources<'_>) {
        if self.state.begin_deinit() {
            close_all(DeviceType::Gnss, res, |handle, res| {
                Self::close(handle, false, res)
            });
        }
    }

    fn add(&mut self, config: &DeviceConfig, res: &mut Resources<'_>) -> Result<DeviceHandle> {
        self.state.ensure_initialised()?;
        check_config(DeviceType::Gnss, config)?;
        let DeviceTypeConfig::Gnss(gnss_config) = &config.device else {
            return Err(Error::InvalidParameter);
        };

        let transport = Self::attach(config, res)?;
        let context = GnssContext {
            transport,
            i2c_address: gnss_config.i2c_address,
        };
        let handle = match res.store.create(DeviceType::Gnss, DeviceContext::Gnss(context)) {
            Ok(handle) => handle,
            Err(err) => {
                Self::detach(transport, res);
                return Err(err);
            }
        };

        if let GnssTransport::I2c { bus, port } = transport {
            if let Err(err) = res.arbiter.bind_device(handle, bus) {
                res.store.destroy(handle);
                Self::detach(transport, res);
                return Err(err);
            }
            info!(
                "Opened GNSS device {} on I2C bus {} ({}), address 0x{:02x}",
                handle, bus, port, context.i2c_address
            );
        } else {
            info!("Opened GNSS device {} via {:?}", handle, transport);
        }
        Ok(handle)
    }

    fn remove(&mut self, handle: DeviceHandle, power_off: bool, res: &mut Resources<'_>) -> Result<()> {
        self.state.ensure_initialised()?;
        Self::close(handle, power_off, res)
    }

    fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle()
    }
}

#[cfg(test)]
mod tests {
    use radiolink_types::{I2cConfig, UartConfig};

    use super::*;
    use crate::arbiter::I2cArbiter;
    use crate::family::CellContext;
    use crate::family::testing::Fixture;

    fn i2c_config(bus: i32) -> DeviceConfig {
        DeviceConfig::defaults(DeviceType::Gnss).with_transport(TransportConfig::I2c(I2cConfig {
            bus,
            clock_hertz: 100_000,
            ..Default::default()
        }))
    }

    fn ready() -> GnssFamily {
        let mut family = GnssFamily::new(true);
        family.init().unwrap();
        family
    }

    #[test]
    fn test_two_devices_share_one_bus() {
        let mut fx = Fixture::new(4);
        let i2c = fx.i2c.clone();
        let mut family = ready();

        let a = family.add(&i2c_config(0), &mut fx.res()).unwrap();
        let b = family.add(&i2c_config(0), &mut fx.res()).unwrap();
        assert_eq!(i2c.open_calls(), 1);
        assert_eq!(fx.arbiter.resource(0).map(|r| r.open_count), Some(2));
        assert_eq!(fx.arbiter.port_of(a), fx.arbiter.port_of(b));

        family.remove(a, false, &mut fx.res()).unwrap();
        assert_eq!(fx.arbiter.resource(0).map(|r| r.open_count), Some(1));
        assert_eq!(i2c.open_port_count(), 1);

        family.remove(b, false, &mut fx.res()).unwrap();
        assert!(fx.arbiter.is_idle());
        assert_eq!(i2c.open_port_count(), 0);
    }

    #[test]
    fn test_store_full_releases_bus() {
        let mut fx = Fixture::new(0);
        let i2c = fx.i2c.clone();
        let mut family = ready();
        assert_eq!(family.add(&i2c_config(1), &mut fx.res()), Err(Error::NoMemory));
        assert!(fx.arbiter.is_idle());
        assert_eq!(i2c.open_port_count(), 0);
    }

    #[test]
    fn test_binding_table_full_rolls_back() {
        let mut fx = Fixture::with_arbiter(4, I2cArbiter::with_capacity(2, 1));
        let i2c = fx.i2c.clone();
        let mut family = ready();
        let first = family.add(&i2c_config(0), &mut fx.res()).unwrap();

        assert_eq!(family.add(&i2c_config(0), &mut fx.res()), Err(Error::NoMemory));
        assert_eq!(fx.store.len(), 1);
        assert_eq!(fx.arbiter.resource(0).map(|r| r.open_count), Some(1));
        assert_eq!(fx.arbiter.bus_of(first), Some(0));
        assert_eq!(i2c.open_port_count(), 1);
    }

    #[test]
    fn test_bus_open_failure_leaves_nothing() {
        let mut fx = Fixture::new(4);
        fx.i2c.fail_open(Some(Error::Platform));
        let mut family = ready();
        assert_eq!(family.add(&i2c_config(0), &mut fx.res()), Err(Error::Platform));
        assert!(fx.store.is_empty());
        assert!(fx.arbiter.is_idle());
    }

    #[test]
    fn test_uart_transport() {
        let mut fx = Fixture::new(4);
        let uart = fx.uart.clone();
        let mut family = ready();
        let cfg = DeviceConfig::defaults(DeviceType::Gnss)
            .with_transport(TransportConfig::Uart(UartConfig::default()));
        let handle = family.add(&cfg, &mut fx.res()).unwrap();
        assert_eq!(uart.open_port_count(), 1);
        family.remove(handle, false, &mut fx.res()).unwrap();
        assert_eq!(uart.open_port_count(), 0);
    }

    #[test]
    fn test_at_transport_needs_at_host() {
        let mut fx = Fixture::new(4);
        let mut family = ready();

        let cell = fx
            .store
            .create(
                DeviceType::Cell,
                DeviceContext::Cell(CellContext {
                    uart: PortHandle::new(9),
                }),
            )
            .unwrap();
        let cfg = DeviceConfig::defaults(DeviceType::Gnss)
            .with_transport(TransportConfig::At { host: cell });
        let handle = family.add(&cfg, &mut fx.res()).unwrap();
        assert!(fx.store.is_valid(handle));

        let cfg = DeviceConfig::defaults(DeviceType::Gnss)
            .with_transport(TransportConfig::At { host: handle });
        assert_eq!(family.add(&cfg, &mut fx.res()), Err(Error::InvalidParameter));

        family.remove(handle, false, &mut fx.res()).unwrap();
        assert!(fx.store.is_valid(cell));
    }

    #[test]
    fn test_no_transport_rejected() {
        let mut fx = Fixture::new(4);
        let mut family = ready();
        let cfg = DeviceConfig::defaults(DeviceType::Gnss).with_transport(TransportConfig::None);
        assert_eq!(family.add(&cfg, &mut fx.res()), Err(Error::InvalidParameter));
    }

    #[test]
    fn test_remove_rejects_other_family() {
        let mut fx = Fixture::new(4);
        let mut family = ready();
        let cell = fx
            .store
            .create(
                DeviceType::Cell,
                DeviceContext::Cell(CellContext {
                    uart: PortHandle::new(0),
                }),
            )
            .unwrap();
        assert_eq!(family.remove(cell, false, &mut fx.res()), Err(Error::InvalidParameter));
        assert!(fx.store.is_valid(cell));
    }

    #[test]
    fn test_deinit_releases_shared_bus() {
        let mut fx = Fixture::new(4);
        let i2c = fx.i2c.clone();
        let mut family = ready();
        family.add(&i2c_config(0), &mut fx.res()).unwrap();
        family.add(&i2c_config(0), &mut fx.res()).unwrap();
        family.add(&i2c_config(1), &mut fx.res()).unwrap();

        family.deinit(&mut fx.res());
        assert!(fx.arbiter.is_idle());
        assert_eq!(i2c.open_port_count(), 0);
        assert!(fx.store.is_empty());
    }
}
