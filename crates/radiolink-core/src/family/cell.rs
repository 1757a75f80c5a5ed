//! Cellular family.

use tracing::info;

use radiolink_types::{DeviceConfig, DeviceHandle, DeviceType, TransportConfig};

use super::{
    DeviceContext, DeviceFamily, FamilyState, Lifecycle, Resources, check_config, close_all,
    instance_of,
};
use crate::error::{Error, Result};
use crate::port::PortHandle;

/// State kept for an open cellular device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellContext {
    /// The module's dedicated UART.
    pub uart: PortHandle,
}

/// Cellular modules, always attached over a dedicated UART.
#[derive(Debug)]
pub struct CellFamily {
    state: FamilyState,
}

impl CellFamily {
    /// Create the family; `enabled = false` models a build without cellular.
    pub fn new(enabled: bool) -> Self {
        Self {
            state: FamilyState::new(DeviceType::Cell, enabled),
        }
    }

    fn close(handle: DeviceHandle, power_off: bool, res: &mut Resources<'_>) -> Result<()> {
        let context = match instance_of(res.store, DeviceType::Cell, handle)?.context {
            DeviceContext::Cell(context) => context,
            _ => return Err(Error::InvalidParameter),
        };
        if power_off {
            info!("Powering off cellular module {}", handle);
        }
        res.uart.close(context.uart);
        res.store.destroy(handle);
        info!("Closed cellular device {}", handle);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut FamilyState {
        &mut self.state
    }
}

impl DeviceFamily for CellFamily {
    fn device_type(&self) -> DeviceType {
        DeviceType::Cell
    }

    fn init(&mut self) -> Result<()> {
        self.state.init()
    }

    fn deinit(&mut self, res: &mut Resources<'_>) {
        if self.state.begin_deinit() {
            close_all(DeviceType::Cell, res, |handle, res| {
                Self::close(handle, false, res)
            });
        }
    }

    fn add(&mut self, config: &DeviceConfig, res: &mut Resources<'_>) -> Result<DeviceHandle> {
        self.state.ensure_initialised()?;
        check_config(DeviceType::Cell, config)?;
        let TransportConfig::Uart(uart_config) = &config.transport else {
            return Err(Error::InvalidParameter);
        };

        let uart = res.uart.open(uart_config)?;
        let handle = match res
            .store
            .create(DeviceType::Cell, DeviceContext::Cell(CellContext { uart }))
        {
            Ok(handle) => handle,
            Err(err) => {
                res.uart.close(uart);
                return Err(err);
            }
        };
        info!("Opened cellular device {} on UART {}", handle, uart_config.uart);
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
    use super::*;
    use crate::family::testing::Fixture;

    #[test]
    fn test_add_before_init_fails() {
        let mut fx = Fixture::new(2);
        let mut family = CellFamily::new(true);
        let cfg = DeviceConfig::defaults(DeviceType::Cell);
        assert_eq!(family.add(&cfg, &mut fx.res()), Err(Error::NotInitialised));
    }

    #[test]
    fn test_add_and_remove() {
        let mut fx = Fixture::new(2);
        let uart = fx.uart.clone();
        let mut family = CellFamily::new(true);
        family.init().unwrap();

        let handle = family
            .add(&DeviceConfig::defaults(DeviceType::Cell), &mut fx.res())
            .unwrap();
        assert_eq!(uart.open_port_count(), 1);

        family.remove(handle, true, &mut fx.res()).unwrap();
        assert_eq!(uart.open_port_count(), 0);
        assert!(!fx.store.is_valid(handle));
    }

    #[test]
    fn test_power_off_closes_like_plain_remove() {
        let mut fx = Fixture::new(2);
        let uart = fx.uart.clone();
        let mut family = CellFamily::new(true);
        family.init().unwrap();
        let cfg = DeviceConfig::defaults(DeviceType::Cell);
        let plain = family.add(&cfg, &mut fx.res()).unwrap();
        let powered = family.add(&cfg, &mut fx.res()).unwrap();

        family.remove(powered, true, &mut fx.res()).unwrap();
        assert!(!fx.store.is_valid(powered));
        assert!(fx.store.is_valid(plain));
        assert_eq!(uart.open_port_count(), 1);
        assert_eq!(uart.close_calls(), 1);

        family.remove(plain, false, &mut fx.res()).unwrap();
        assert_eq!(uart.open_port_count(), 0);
        assert_eq!(uart.close_calls(), 2);
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_requires_uart() {
        let mut fx = Fixture::new(2);
        let mut family = CellFamily::new(true);
        family.init().unwrap();
        let cfg = DeviceConfig::defaults(DeviceType::Cell).with_transport(TransportConfig::None);
        assert_eq!(family.add(&cfg, &mut fx.res()), Err(Error::InvalidParameter));
    }

    #[test]
    fn test_store_full_closes_uart() {
        let mut fx = Fixture::new(0);
        let uart = fx.uart.clone();
        let mut family = CellFamily::new(true);
        family.init().unwrap();
        let cfg = DeviceConfig::defaults(DeviceType::Cell);
        assert_eq!(family.add(&cfg, &mut fx.res()), Err(Error::NoMemory));
        assert_eq!(uart.open_port_count(), 0);
        assert_eq!(uart.close_calls(), 1);
    }

    #[test]
    fn test_disabled_family_reports_not_implemented() {
        let mut family = CellFamily::new(false);
        assert_eq!(family.init(), Err(Error::NotImplemented));
        assert_eq!(family.lifecycle(), Lifecycle::Uninitialised);
    }

    #[test]
    fn test_deinit_closes_open_devices() {
        let mut fx = Fixture::new(4);
        let uart = fx.uart.clone();
        let mut family = CellFamily::new(true);
        family.init().unwrap();
        let cfg = DeviceConfig::defaults(DeviceType::Cell);
        family.add(&cfg, &mut fx.res()).unwrap();
        family.add(&cfg, &mut fx.res()).unwrap();

        family.deinit(&mut fx.res());
        assert_eq!(uart.open_port_count(), 0);
        assert!(fx.store.is_empty());
        assert_eq!(family.lifecycle(), Lifecycle::Deinitialised);
        assert_eq!(family.add(&cfg, &mut fx.res()), Err(Error::NotInitialised));

        family.init().unwrap();
        assert!(family.add(&cfg, &mut fx.res()).is_ok());
    }
}
