//! Per-type device families.
//!
//! Each radio family (cellular, GNSS, short-range, short-range open CPU)
//! implements [`DeviceFamily`]: `init`, `deinit`, `add` and `remove`. A family
//! owns the layout of its devices' [`DeviceContext`] and decides which
//! transports it accepts.
//!
//! Every family follows the same lifecycle:
//!
//! ```text
//! Uninitialised --init--> Initialised --deinit--> Deinitialised
//!                          |      ^                    |
//!                         add  remove                init
//!                          v      |                    v
//!                         (devices open)          Initialised
//! ```
//!
//! `add`/`remove` outside `Initialised` fail with [`Error::NotInitialised`].
//! A family switched off in the registry configuration answers `init` with
//! [`Error::NotImplemented`] and stays `Uninitialised`.

mod cell;
mod gnss;
mod short_range;

pub use cell::{CellContext, CellFamily};
pub use gnss::{GnssContext, GnssFamily, GnssTransport};
pub use short_range::{ShortRangeContext, ShortRangeFamily};

use tracing::{debug, warn};

use radiolink_types::{DeviceConfig, DeviceHandle, DeviceType};

use crate::arbiter::I2cArbiter;
use crate::error::{Error, Result};
use crate::port::{I2cPort, UartPort};
use crate::store::{DeviceInstance, DeviceStore};

/// Family-private state stored in each device instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceContext {
    /// Cellular device state.
    Cell(CellContext),
    /// GNSS device state.
    Gnss(GnssContext),
    /// Short-range device state.
    ShortRange(ShortRangeContext),
}

/// Everything a family may touch while the registry gate is held.
pub struct Resources<'a> {
    /// Device instances.
    pub store: &'a mut DeviceStore<DeviceContext>,
    /// Shared I2C bookkeeping.
    pub arbiter: &'a mut I2cArbiter,
    /// I2C driver.
    pub i2c: &'a mut dyn I2cPort,
    /// UART driver.
    pub uart: &'a mut dyn UartPort,
}

/// Where a family is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// `init` never succeeded.
    Uninitialised,
    /// Ready for `add`/`remove`.
    Initialised,
    /// Torn down by `deinit`.
    Deinitialised,
}

/// The four-operation contract every family implements.
pub trait DeviceFamily {
    /// Device type this family serves.
    fn device_type(&self) -> DeviceType;

    /// Bring the family up. Idempotent.
    fn init(&mut self) -> Result<()>;

    /// Close every device this family still has open, then tear down.
    fn deinit(&mut self, res: &mut Resources<'_>);

    /// Open a device.
    ///
    /// On failure nothing acquired during the call is left behind.
    fn add(&mut self, config: &DeviceConfig, res: &mut Resources<'_>) -> Result<DeviceHandle>;

    /// Close a device, optionally powering it off first.
    fn remove(&mut self, handle: DeviceHandle, power_off: bool, res: &mut Resources<'_>) -> Result<()>;

    /// Current lifecycle state.
    fn lifecycle(&self) -> Lifecycle;
}

/// Lifecycle bookkeeping shared by the family implementations.
#[derive(Debug)]
pub(crate) struct FamilyState {
    device_type: DeviceType,
    enabled: bool,
    lifecycle: Lifecycle,
    #[cfg(test)]
    fail_init: Option<Error>,
}

impl FamilyState {
    pub(crate) fn new(device_type: DeviceType, enabled: bool) -> Self {
        Self {
            device_type,
            enabled,
            lifecycle: Lifecycle::Uninitialised,
            #[cfg(test)]
            fail_init: None,
        }
    }

    pub(crate) fn init(&mut self) -> Result<()> {
        #[cfg(test)]
        if let Some(err) = self.fail_init {
            return Err(err);
        }
        if !self.enabled {
            debug!("{} family absent from this build", self.device_type);
            return Err(Error::NotImplemented);
        }
        if self.lifecycle != Lifecycle::Initialised {
            self.lifecycle = Lifecycle::Initialised;
            debug!("{} family initialised", self.device_type);
        }
        Ok(())
    }

    /// Returns `false` if there was nothing to tear down.
    pub(crate) fn begin_deinit(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Initialised {
            return false;
        }
        self.lifecycle = Lifecycle::Deinitialised;
        debug!("{} family deinitialised", self.device_type);
        true
    }

    pub(crate) fn ensure_initialised(&self) -> Result<()> {
        if self.lifecycle == Lifecycle::Initialised {
            Ok(())
        } else {
            Err(Error::NotInitialised)
        }
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub(crate) fn device_type(&self) -> DeviceType {
        self.device_type
    }

    #[cfg(test)]
    pub(crate) fn inject_init_failure(&mut self, err: Option<Error>) {
        self.fail_init = err;
    }
}

/// Check that `config` is meant for `family`.
pub(crate) fn check_config(family: DeviceType, config: &DeviceConfig) -> Result<()> {
    if config.device_type != family || !config.device.fits(family) {
        return Err(Error::InvalidParameter);
    }
    Ok(())
}

/// Look up a live instance of `family`.
pub(crate) fn instance_of<'s>(
    store: &'s DeviceStore<DeviceContext>,
    family: DeviceType,
    handle: DeviceHandle,
) -> Result<&'s DeviceInstance<DeviceContext>> {
    store
        .get(handle)
        .filter(|instance| instance.device_type() == family)
        .ok_or(Error::InvalidParameter)
}

/// Close every device of `device_type`, logging rather than stopping on failure.
pub(crate) fn close_all(
    device_type: DeviceType,
    res: &mut Resources<'_>,
    mut close: impl FnMut(DeviceHandle, &mut Resources<'_>) -> Result<()>,
) {
    for handle in res.store.handles_of(device_type) {
        if let Err(err) = close(handle, res) {
            warn!("Closing {} device {} during deinit failed: {}", device_type, handle, err);
        }
    }
}
