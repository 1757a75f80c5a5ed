//! Short-range radio families.
//!
//! One implementation serves both short-range device types. A plain
//! short-range module is driven over its own UART. In the open-CPU variant
//! the radio runs on the same chip as this code, so a UART is optional.
//! Neither variant supports being powered off through `remove`.

use tracing::info;

use radiolink_types::{DeviceConfig, DeviceHandle, DeviceType, TransportConfig};

use super::{
    DeviceContext, DeviceFamily, FamilyState, Lifecycle, Resources, check_config, close_all,
    instance_of,
};
use crate::error::{Error, Result};
use crate::port::PortHandle;

/// State kept for an open short-range device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortRangeContext {
    /// UART, absent for an open-CPU radio without one.
    pub uart: Option<PortHandle>,
    /// Whether this is the open-CPU variant.
    pub open_cpu: bool,
}

/// Short-range modules, external or open CPU.
#[derive(Debug)]
pub struct ShortRangeFamily {
    state: FamilyState,
}

impl ShortRangeFamily {
    /// Create the external (`open_cpu = false`) or open-CPU family.
    pub fn new(open_cpu: bool, enabled: bool) -> Self {
        let device_type = if open_cpu {
            DeviceType::ShortRangeOpenCpu
        } else {
            DeviceType::ShortRange
        };
        Self {
            state: FamilyState::new(device_type, enabled),
        }
    }

    fn open_cpu(&self) -> bool {
        self.state.device_type() == DeviceType::ShortRangeOpenCpu
    }

    fn close(device_type: DeviceType, handle: DeviceHandle, res: &mut Resources<'_>) -> Result<()> {
        let context = match instance_of(res.store, device_type, handle)?.context {
            DeviceContext::ShortRange(context) => context,
            _ => return Err(Error::InvalidParameter),
        };
        if let Some(uart) = context.uart {
            res.uart.close(uart);
        }
        res.store.destroy(handle);
        info!("Closed {} device {}", device_type, handle);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut FamilyState {
        &mut self.state
    }
}

impl DeviceFamily for ShortRangeFamily {
    fn device_type(&self) -> DeviceType {
        self.state.device_type()
    }

    fn init(&mut self) -> Result<()> {
        self.state.init()
    }

    fn deinit(&mut self, res: &mut Resources<'_>) {
        let device_type = self.state.device_type();
        if self.state.begin_deinit() {
            close_all(device_type, res, |handle, res| {
                Self::close(device_type, handle, res)
            });
        }
    }

    fn add(&mut self, config: &DeviceConfig, res: &mut Resources<'_>) -> Result<DeviceHandle> {
        self.state.ensure_initialised()?;
        let device_type = self.state.device_type();
        check_config(device_type, config)?;

        let uart = match &config.transport {
            TransportConfig::Uart(uart_config) => Some(res.uart.open(uart_config)?),
            TransportConfig::None if self.open_cpu() => None,
            _ => return Err(Error::InvalidParameter),
        };
        let context = ShortRangeContext {
            uart,
            open_cpu: self.open_cpu(),
        };
        let handle = match res
            .store
            .create(device_type, DeviceContext::ShortRange(context))
        {
            Ok(handle) => handle,
            Err(err) => {
                if let Some(uart) = uart {
                    res.uart.close(uart);
                }
                return Err(err);
            }
        };
        info!("Opened {} device {}", device_type, handle);
        Ok(handle)
    }

    fn remove(&mut self, handle: DeviceHandle, power_off: bool, res: &mut Resources<'_>) -> Result<()> {
        self.state.ensure_initialised()?;
        if power_off {
            return Err(Error::InvalidParameter);
        }
        Self::close(self.state.device_type(), handle, res)
    }

    fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle()
    }
}
