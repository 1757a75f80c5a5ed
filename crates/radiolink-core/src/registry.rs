//! The device registry facade.
//!
//! [`DeviceRegistry`] is what the application talks to: `init`, `deinit`,
//! `open` and `close`, plus a few read accessors. Every call takes the
//! registry's single [`Gate`], so all device operations across all families
//! are totally ordered and the I2C arbiter needs no locking of its own.
//!
//! The gate is not reentrant: nothing running while a registry call holds it
//! may call back into the same registry.

use tracing::{debug, info, warn};

use radiolink_types::{DeviceConfig, DeviceHandle, DeviceType};

use crate::arbiter::{I2cArbiter, I2cResource};
use crate::config::RegistryConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::family::{DeviceContext, Resources};
use crate::gate::Gate;
use crate::location::LocationService;
use crate::port::{I2cPort, PortHandle, UartPort};
use crate::store::DeviceStore;

/// Everything the gate protects.
struct RegistryState {
    store: DeviceStore<DeviceContext>,
    arbiter: I2cArbiter,
    dispatcher: Dispatcher,
    location: LocationService,
    i2c: Box<dyn I2cPort>,
    uart: Box<dyn UartPort>,
    /// Set between a successful bring-up and the matching teardown.
    running: bool,
}

impl RegistryState {
    fn split(&mut self) -> (&mut Dispatcher, Resources<'_>) {
        (
            &mut self.dispatcher,
            Resources {
                store: &mut self.store,
                arbiter: &mut self.arbiter,
                i2c: &mut *self.i2c,
                uart: &mut *self.uart,
            },
        )
    }

    fn bring_up(&mut self) -> Result<()> {
        if !self.running && self.store.is_empty() {
            self.arbiter.reset_all();
        }
        self.dispatcher.init_all()?;
        match self.location.init(&self.dispatcher) {
            Ok(()) | Err(Error::NotImplemented) => {}
            Err(err) => return Err(err),
        }
        self.running = true;
        Ok(())
    }

    fn tear_down(&mut self) {
        self.location.deinit();
        let (dispatcher, mut res) = self.split();
        dispatcher.deinit_all(&mut res);
        self.running = false;
    }

    fn open(&mut self, config: &DeviceConfig) -> Result<DeviceHandle> {
        if config.version != 0 {
            debug!("Rejecting device config version {}", config.version);
            return Err(Error::InvalidParameter);
        }
        if !config.device.fits(config.device_type) {
            return Err(Error::InvalidParameter);
        }

        let (dispatcher, mut res) = self.split();
        let handle = dispatcher.add(config, &mut res)?;
        if let Some(instance) = self.store.get_mut(handle) {
            instance.module_type = config.module_type();
        }
        Ok(handle)
    }

    fn close(&mut self, handle: DeviceHandle, power_off: bool) -> Result<()> {
        let (dispatcher, mut res) = self.split();
        dispatcher.remove(handle, power_off, &mut res)
    }
}

/// Registry of open radio devices.
///
/// # Example
///
/// ```
/// use radiolink_core::mock::{MockI2cPort, MockUartPort};
/// use radiolink_core::{DeviceRegistry, RegistryConfig};
/// use radiolink_types::{DeviceConfig, DeviceType};
///
/// let registry = DeviceRegistry::new(
///     RegistryConfig::default(),
///     MockI2cPort::new(),
///     MockUartPort::new(),
/// );
/// registry.init().unwrap();
///
/// let gnss = registry.open(&DeviceConfig::defaults(DeviceType::Gnss)).unwrap();
/// assert_eq!(registry.device_type(gnss).unwrap(), DeviceType::Gnss);
///
/// registry.close(gnss, false).unwrap();
/// registry.deinit().unwrap();
/// ```
pub struct DeviceRegistry {
    gate: Gate<RegistryState>,
    config: RegistryConfig,
}

impl DeviceRegistry {
    /// Create a registry driving the given ports.
    ///
    /// Table sizes and family switches come from `config`, which should have
    /// passed [`RegistryConfig::validate`]. Nothing is usable before
    /// [`init`](Self::init).
    pub fn new<I, U>(config: RegistryConfig, i2c: I, uart: U) -> Self
    where
        I: I2cPort + 'static,
        U: UartPort + 'static,
    {
        let capacity = config.capacity;
        let state = RegistryState {
            store: DeviceStore::with_capacity(capacity.devices),
            arbiter: I2cArbiter::with_capacity(capacity.i2c_resources, capacity.i2c_bindings),
            dispatcher: Dispatcher::new(&config.families),
            location: LocationService::default(),
            i2c: Box::new(i2c),
            uart: Box::new(uart),
            running: false,
        };
        Self {
            gate: Gate::new(state),
            config,
        }
    }

    /// The configuration this registry was built from.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Bring the registry up.
    ///
    /// Opens the gate, initialises every family (absent families are
    /// skipped) and then location services. On a hard failure everything is
    /// unwound again and the gate closed. Calling `init` on a running
    /// registry is harmless.
    pub fn init(&self) -> Result<()> {
        self.gate.create()?;
        let mut state = self.gate.lock()?;
        if let Err(err) = state.bring_up() {
            warn!("Device registry init failed, rolling back: {}", err);
            state.tear_down();
            drop(state);
            self.gate.destroy();
            return Err(err);
        }
        info!("Device registry initialised");
        Ok(())
    }

    /// Tear the registry down, closing every device still open.
    ///
    /// Best effort: failures are logged and teardown carries on. Always
    /// succeeds, also on a registry that was never initialised.
    pub fn deinit(&self) -> Result<()> {
        match self.gate.lock() {
            Ok(mut state) => state.tear_down(),
            Err(_) => debug!("Device registry not initialised, nothing to tear down"),
        }
        self.gate.destroy();
        info!("Device registry deinitialised");
        Ok(())
    }

    /// Open a device.
    ///
    /// Fails with [`Error::InvalidParameter`] for a config whose version is
    /// not `0` or whose settings do not match its device type, and with
    /// whatever the device's family reports otherwise.
    pub fn open(&self, config: &DeviceConfig) -> Result<DeviceHandle> {
        self.gate.lock()?.open(config)
    }

    /// Close a device, optionally powering it off first.
    pub fn close(&self, handle: DeviceHandle, power_off: bool) -> Result<()> {
        self.gate.lock()?.close(handle, power_off)
    }

    /// Open every device declared in the configuration, in order.
    ///
    /// If one fails, the devices already opened by this call are closed
    /// again before the error is returned.
    pub fn open_configured(&self) -> Result<Vec<DeviceHandle>> {
        let mut state = self.gate.lock()?;
        let mut handles = Vec::with_capacity(self.config.devices.len());
        for (i, config) in self.config.devices.iter().enumerate() {
            match state.open(config) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    warn!("Opening configured device {} failed: {}", i, err);
                    for handle in handles.into_iter().rev() {
                        if let Err(err) = state.close(handle, false) {
                            warn!("Closing {} during rollback failed: {}", handle, err);
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(handles)
    }

    /// Device type of an open device.
    pub fn device_type(&self, handle: DeviceHandle) -> Result<DeviceType> {
        self.gate.with(|state| state.store.device_type(handle))?
    }

    /// Module type an open device was opened with.
    pub fn module_type(&self, handle: DeviceHandle) -> Result<i32> {
        self.gate.with(|state| {
            state
                .store
                .get(handle)
                .map(|instance| instance.module_type)
                .ok_or(Error::InvalidParameter)
        })?
    }

    /// Returns `true` if `handle` refers to an open device of this registry.
    pub fn is_valid(&self, handle: DeviceHandle) -> bool {
        self.gate
            .with(|state| state.store.is_valid(handle))
            .unwrap_or(false)
    }

    /// Number of open devices.
    pub fn device_count(&self) -> usize {
        self.gate.with(|state| state.store.len()).unwrap_or(0)
    }

    /// The shared resource for an open I2C bus.
    pub fn i2c_resource(&self, bus: i32) -> Option<I2cResource> {
        self.gate
            .with(|state| state.arbiter.resource(bus))
            .ok()
            .flatten()
    }

    /// Port handle of the I2C bus `handle` is bound to.
    pub fn i2c_port_of(&self, handle: DeviceHandle) -> Option<PortHandle> {
        self.gate
            .with(|state| state.arbiter.port_of(handle))
            .ok()
            .flatten()
    }

    /// Returns `true` between a successful [`init`](Self::init) and [`deinit`](Self::deinit).
    pub fn is_initialised(&self) -> bool {
        self.gate.is_created()
    }

    /// Returns `true` if location services came up with the registry.
    pub fn is_location_available(&self) -> bool {
        self.gate
            .with(|state| state.location.is_active())
            .unwrap_or(false)
    }

    #[cfg(test)]
    fn inject_init_failure(&mut self, device_type: DeviceType, err: Option<Error>) {
        self.gate
            .get_mut()
            .dispatcher
            .inject_init_failure(device_type, err);
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("initialised", &self.is_initialised())
            .field("devices", &self.device_count())
            .finish()
    }
}
