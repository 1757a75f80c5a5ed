//! Shared I2C bus arbitration.
//!
//! Several logical devices may sit on one physical I2C bus. The arbiter opens
//! each bus the first time any device asks for it, hands every later user the
//! same [`PortHandle`], counts references, and closes the port when the last
//! reference goes away.
//!
//! Two fixed-capacity tables hold the bookkeeping:
//!
//! - **resources**: one entry per open bus (`bus`, `port`, `open_count`)
//! - **bindings**: which device is using which resource entry
//!
//! # Locking
//!
//! The arbiter does no locking of its own. Every method takes `&mut self`,
//! and the registry only reaches the arbiter through its gate, so table
//! edits never race.
//!
//! # Teardown order
//!
//! When a resource's count reaches zero the port is closed, then every
//! binding that pointed at the entry is cleared, then the entry itself.
//! A port is never closed while its count is non-zero.

use tracing::{debug, info, warn};

use radiolink_types::{DeviceHandle, I2cConfig};

use crate::error::{Error, Result};
use crate::port::{I2cPort, PortHandle};

/// Default number of distinct buses open at once.
pub const I2C_RESOURCE_CAPACITY_DEFAULT: usize = 4;

/// Default number of device-to-bus bindings.
pub const I2C_BINDING_CAPACITY_DEFAULT: usize = 10;

/// One open physical I2C bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cResource {
    /// Bus number.
    pub bus: i32,
    /// Driver handle shared by every user of the bus.
    pub port: PortHandle,
    /// Number of outstanding acquisitions.
    pub open_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct I2cBinding {
    device: DeviceHandle,
    resource: usize,
}

/// Reference-counted I2C bus tables.
#[derive(Debug)]
pub struct I2cArbiter {
    resources: Box<[Option<I2cResource>]>,
    bindings: Box<[Option<I2cBinding>]>,
}

impl Default for I2cArbiter {
    fn default() -> Self {
        Self::with_capacity(I2C_RESOURCE_CAPACITY_DEFAULT, I2C_BINDING_CAPACITY_DEFAULT)
    }
}

impl I2cArbiter {
    /// Create an arbiter with the given table sizes.
    pub fn with_capacity(resources: usize, bindings: usize) -> Self {
        Self {
            resources: vec![None; resources].into_boxed_slice(),
            bindings: vec![None; bindings].into_boxed_slice(),
        }
    }

    fn resource_index(&self, bus: i32) -> Option<usize> {
        self.resources
            .iter()
            .position(|entry| entry.is_some_and(|r| r.bus == bus))
    }

    fn binding_index(&self, device: DeviceHandle) -> Option<usize> {
        self.bindings
            .iter()
            .position(|entry| entry.is_some_and(|b| b.device == device))
    }

    /// Obtain the port for `params.bus`, opening it if nobody has yet.
    ///
    /// On first use the bus is adopted (when `params.already_open`) or opened
    /// through `port`, and `params.clock_hertz` is applied to a freshly
    /// opened bus when non-zero. A clock failure closes the bus again. If the
    /// resource table is full the just-opened bus is closed and
    /// [`Error::NoMemory`] returned.
    ///
    /// Later calls for the same bus only bump `open_count` and return the
    /// existing handle; their pins, clock and adopt flag are ignored.
    pub fn acquire_bus(&mut self, port: &mut dyn I2cPort, params: &I2cConfig) -> Result<PortHandle> {
        if params.bus < 0 {
            return Err(Error::InvalidParameter);
        }

        if let Some(resource) = self
            .resources
            .iter_mut()
            .flatten()
            .find(|r| r.bus == params.bus)
        {
            resource.open_count += 1;
            debug!(
                "I2C bus {} shared, open count now {}",
                resource.bus, resource.open_count
            );
            return Ok(resource.port);
        }

        let handle = if params.already_open {
            let handle = port.adopt(params.bus)?;
            debug!("Adopted I2C bus {} as {}", params.bus, handle);
            handle
        } else {
            let handle = port.open(params.bus, params.pin_sda, params.pin_scl)?;
            if params.clock_hertz > 0 {
                if let Err(err) = port.set_clock(handle, params.clock_hertz) {
                    warn!(
                        "Setting I2C bus {} clock to {} Hz failed: {}",
                        params.bus, params.clock_hertz, err
                    );
                    port.close(handle);
                    return Err(err);
                }
            }
            info!("Opened I2C bus {} as {}", params.bus, handle);
            handle
        };

        match self.resources.iter_mut().find(|entry| entry.is_none()) {
            Some(entry) => {
                *entry = Some(I2cResource {
                    bus: params.bus,
                    port: handle,
                    open_count: 1,
                });
                Ok(handle)
            }
            None => {
                warn!("I2C resource table full, closing bus {}", params.bus);
                port.close(handle);
                Err(Error::NoMemory)
            }
        }
    }

    /// Record that `device` uses the already-acquired `bus`.
    ///
    /// A device holds at most one binding. Fails with
    /// [`Error::InvalidParameter`] for a bus that is not open or a device
    /// that is already bound, and with [`Error::NoMemory`] when the binding
    /// table is full. On failure the caller still owns the reference it
    /// acquired and must give it back with [`release_by_bus`](Self::release_by_bus).
    pub fn bind_device(&mut self, device: DeviceHandle, bus: i32) -> Result<()> {
        let resource = self.resource_index(bus).ok_or(Error::InvalidParameter)?;
        if let Some(existing) = self.bus_of(device) {
            warn!("{} already bound to I2C bus {}, not binding to {}", device, existing, bus);
            return Err(Error::InvalidParameter);
        }
        let index = self
            .bindings
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| {
                warn!("I2C binding table full, cannot bind {}", device);
                Error::NoMemory
            })?;
        self.bindings[index] = Some(I2cBinding { device, resource });
        debug!("Bound {} to I2C bus {}", device, bus);
        Ok(())
    }

    /// Drop `device`'s reference to its bus.
    ///
    /// Fails with [`Error::NotFound`] if the device holds no binding.
    pub fn release_by_device(&mut self, port: &mut dyn I2cPort, device: DeviceHandle) -> Result<()> {
        let binding = self.binding_index(device).ok_or(Error::NotFound)?;
        let Some(I2cBinding { resource, .. }) = self.bindings[binding] else {
            return Err(Error::NotFound);
        };
        if !self.release(port, resource) {
            self.bindings[binding] = None;
        }
        Ok(())
    }

    /// Drop one reference to `bus` that was never bound to a device.
    ///
    /// Fails with [`Error::NotFound`] if the bus is not open.
    pub fn release_by_bus(&mut self, port: &mut dyn I2cPort, bus: i32) -> Result<()> {
        let resource = self.resource_index(bus).ok_or(Error::NotFound)?;
        self.release(port, resource);
        Ok(())
    }

    /// Decrement a resource; returns `true` if that closed it.
    fn release(&mut self, port: &mut dyn I2cPort, index: usize) -> bool {
        let Some(resource) = self.resources[index].as_mut() else {
            return false;
        };
        resource.open_count = resource.open_count.saturating_sub(1);
        if resource.open_count > 0 {
            debug!(
                "I2C bus {} released, open count now {}",
                resource.bus, resource.open_count
            );
            return false;
        }

        let I2cResource { bus, port: handle, .. } = *resource;
        port.close(handle);
        for entry in self.bindings.iter_mut() {
            if entry.is_some_and(|b| b.resource == index) {
                *entry = None;
            }
        }
        self.resources[index] = None;
        info!("Closed I2C bus {} ({})", bus, handle);
        true
    }

    /// Forget every resource and binding without touching any port.
    pub fn reset_all(&mut self) {
        self.resources.fill(None);
        self.bindings.fill(None);
    }

    /// The open resource for `bus`.
    pub fn resource(&self, bus: i32) -> Option<I2cResource> {
        self.resource_index(bus).and_then(|index| self.resources[index])
    }

    /// Every open resource.
    pub fn resources(&self) -> impl Iterator<Item = &I2cResource> {
        self.resources.iter().flatten()
    }

    /// Bus `device` is bound to.
    pub fn bus_of(&self, device: DeviceHandle) -> Option<i32> {
        let binding = self.bindings[self.binding_index(device)?]?;
        self.resources[binding.resource].map(|r| r.bus)
    }

    /// Port `device` reaches its bus through.
    pub fn port_of(&self, device: DeviceHandle) -> Option<PortHandle> {
        let binding = self.bindings[self.binding_index(device)?]?;
        self.resources[binding.resource].map(|r| r.port)
    }

    /// Number of live bindings onto `bus`.
    pub fn binding_count(&self, bus: i32) -> usize {
        let Some(resource) = self.resource_index(bus) else {
            return 0;
        };
        self.bindings
            .iter()
            .flatten()
            .filter(|b| b.resource == resource)
            .count()
    }

    /// Number of live bindings in total.
    pub fn bindings_in_use(&self) -> usize {
        self.bindings.iter().flatten().count()
    }

    /// Returns `true` if no bus is open and no binding exists.
    pub fn is_idle(&self) -> bool {
        self.resources.iter().all(Option::is_none) && self.bindings.iter().all(Option::is_none)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::mock::MockI2cPort;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Attach { device: u32, bus: i32 },
        Detach { device: u32 },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..8, 0i32..3).prop_map(|(device, bus)| Op::Attach { device, bus }),
            (0u32..8).prop_map(|device| Op::Detach { device }),
        ]
    }

    proptest! {
        /// Devices attaching (rebinds included) and detaching in any order
        /// keep each bus's count equal to its live bindings, and a port is
        /// open exactly while its bus has a resource entry.
        #[test]
        fn counts_track_bindings(ops in proptest::collection::vec(op(), 0..64)) {
            let mock = MockI2cPort::new();
            let mut port = mock.clone();
            let mut arbiter = I2cArbiter::with_capacity(2, 6);

            for op in ops {
                match op {
                    Op::Attach { device, bus } => {
                        let handle = DeviceHandle::from_parts(0, device, 0);
                        let params = I2cConfig { bus, ..Default::default() };
                        if arbiter.acquire_bus(&mut port, &params).is_ok()
                            && arbiter.bind_device(handle, bus).is_err()
                        {
                            arbiter.release_by_bus(&mut port, bus).unwrap();
                        }
                    }
                    Op::Detach { device } => {
                        let handle = DeviceHandle::from_parts(0, device, 0);
                        let _ = arbiter.release_by_device(&mut port, handle);
                    }
                }

                for resource in arbiter.resources() {
                    prop_assert!(resource.open_count > 0);
                    prop_assert_eq!(resource.open_count as usize, arbiter.binding_count(resource.bus));
                    prop_assert!(mock.is_open(resource.port));
                }
                prop_assert_eq!(mock.open_port_count(), arbiter.resources().count());
            }
        }
    }
}
