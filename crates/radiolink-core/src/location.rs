//! Location services.
//!
//! Position fixes come from a GNSS receiver or from the cellular network, so
//! location services exist only in builds carrying at least one of those
//! families. They hold no devices of their own.

use tracing::debug;

use radiolink_types::DeviceType;

use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub(crate) struct LocationService {
    active: bool,
}

impl LocationService {
    /// Fails with [`Error::NotImplemented`] when neither cellular nor GNSS is present.
    pub(crate) fn init(&mut self, dispatcher: &Dispatcher) -> Result<()> {
        if !dispatcher.is_present(DeviceType::Cell) && !dispatcher.is_present(DeviceType::Gnss) {
            debug!("No cellular or GNSS family, location services unavailable");
            return Err(Error::NotImplemented);
        }
        if !self.active {
            self.active = true;
            debug!("Location services initialised");
        }
        Ok(())
    }

    pub(crate) fn deinit(&mut self) {
        if self.active {
            self.active = false;
            debug!("Location services deinitialised");
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }
}
