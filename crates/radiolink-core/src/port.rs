//! Transport port collaborators.
//!
//! The registry never touches hardware itself. Physical buses are reached
//! through these traits, implemented by the platform layer (or by the mocks
//! in [`crate::mock`] for tests).

use radiolink_types::UartConfig;

use crate::error::Result;

/// Opaque handle returned by a port driver for an open bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortHandle(i32);

impl PortHandle {
    /// Wrap a raw driver handle.
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw driver handle.
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for PortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "port{}", self.0)
    }
}

/// I2C bus driver.
///
/// # Errors
///
/// Drivers report failures with the common error variants, typically
/// [`Error::Platform`](crate::Error::Platform) for hardware faults and
/// [`Error::NotSupported`](crate::Error::NotSupported) for reconfiguring an
/// adopted bus.
pub trait I2cPort: Send {
    /// Initialise bus `bus` on the given pins and open it.
    fn open(&mut self, bus: i32, pin_sda: i32, pin_scl: i32) -> Result<PortHandle>;

    /// Take over bus `bus`, already initialised by the application, without
    /// touching its hardware configuration.
    fn adopt(&mut self, bus: i32) -> Result<PortHandle>;

    /// Close an open or adopted bus. An adopted bus is only forgotten.
    fn close(&mut self, handle: PortHandle);

    /// Set the bus clock.
    fn set_clock(&mut self, handle: PortHandle, hertz: i32) -> Result<()>;
}

/// UART driver. UARTs are single-owner: one device, one port.
pub trait UartPort: Send {
    /// Open a UART.
    fn open(&mut self, config: &UartConfig) -> Result<PortHandle>;

    /// Close a UART.
    fn close(&mut self, handle: PortHandle);
}

impl<P: I2cPort + ?Sized> I2cPort for Box<P> {
    fn open(&mut self, bus: i32, pin_sda: i32, pin_scl: i32) -> Result<PortHandle> {
        (**self).open(bus, pin_sda, pin_scl)
    }

    fn adopt(&mut self, bus: i32) -> Result<PortHandle> {
        (**self).adopt(bus)
    }

    fn close(&mut self, handle: PortHandle) {
        (**self).close(handle)
    }

    fn set_clock(&mut self, handle: PortHandle, hertz: i32) -> Result<()> {
        (**self).set_clock(handle, hertz)
    }
}

impl<P: UartPort + ?Sized> UartPort for Box<P> {
    fn open(&mut self, config: &UartConfig) -> Result<PortHandle> {
        (**self).open(config)
    }

    fn close(&mut self, handle: PortHandle) {
        (**self).close(handle)
    }
}
