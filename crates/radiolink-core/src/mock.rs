//! Mock transport ports for testing.
//!
//! [`MockI2cPort`] and [`MockUartPort`] implement the port traits without any
//! hardware. Both are cheap to clone and every clone shares the same state,
//! so a test can hand one clone to a registry and keep another to inspect
//! what the registry did.
//!
//! # Features
//!
//! - **Inspection**: which ports are open, on which bus, at which clock
//! - **Call counting**: opens, adopts, closes, clock changes
//! - **Failure injection**: make open, adopt or set_clock fail

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use radiolink_types::UartConfig;

use crate::error::{Error, Result};
use crate::port::{I2cPort, PortHandle, UartPort};

/// An open bus as seen by the mock driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockI2cBus {
    /// Bus number.
    pub bus: i32,
    /// Whether the bus was adopted rather than opened.
    pub adopted: bool,
    /// Clock applied through `set_clock`, if any.
    pub clock_hertz: Option<i32>,
}

#[derive(Debug, Default)]
struct I2cState {
    next_handle: i32,
    open: BTreeMap<PortHandle, MockI2cBus>,
    open_calls: u32,
    adopt_calls: u32,
    close_calls: u32,
    set_clock_calls: u32,
    fail_open: Option<Error>,
    fail_adopt: Option<Error>,
    fail_set_clock: Option<Error>,
}

/// A mock I2C driver.
///
/// # Example
///
/// ```
/// use radiolink_core::mock::MockI2cPort;
/// use radiolink_core::port::I2cPort;
///
/// let mock = MockI2cPort::new();
/// let mut driver = mock.clone();
/// let handle = driver.open(0, 4, 5).unwrap();
/// assert!(mock.is_open(handle));
/// driver.close(handle);
/// assert_eq!(mock.open_port_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockI2cPort {
    state: Arc<Mutex<I2cState>>,
}

impl MockI2cPort {
    /// Create a mock with no open buses.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, I2cState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent `open` fail with `error` (`None` restores success).
    pub fn fail_open(&self, error: Option<Error>) {
        self.state().fail_open = error;
    }

    /// Make every subsequent `adopt` fail with `error`.
    pub fn fail_adopt(&self, error: Option<Error>) {
        self.state().fail_adopt = error;
    }

    /// Make every subsequent `set_clock` fail with `error`.
    pub fn fail_set_clock(&self, error: Option<Error>) {
        self.state().fail_set_clock = error;
    }

    /// Returns `true` if `handle` is currently open.
    pub fn is_open(&self, handle: PortHandle) -> bool {
        self.state().open.contains_key(&handle)
    }

    /// Details of an open handle.
    pub fn bus(&self, handle: PortHandle) -> Option<MockI2cBus> {
        self.state().open.get(&handle).copied()
    }

    /// Number of currently open handles.
    pub fn open_port_count(&self) -> usize {
        self.state().open.len()
    }

    /// Number of `open` calls, successful or not.
    pub fn open_calls(&self) -> u32 {
        self.state().open_calls
    }

    /// Number of `adopt` calls, successful or not.
    pub fn adopt_calls(&self) -> u32 {
        self.state().adopt_calls
    }

    /// Number of `close` calls.
    pub fn close_calls(&self) -> u32 {
        self.state().close_calls
    }

    /// Number of `set_clock` calls.
    pub fn set_clock_calls(&self) -> u32 {
        self.state().set_clock_calls
    }

    fn insert(state: &mut I2cState, bus: MockI2cBus) -> PortHandle {
        let handle = PortHandle::new(state.next_handle);
        state.next_handle += 1;
        state.open.insert(handle, bus);
        handle
    }
}

impl I2cPort for MockI2cPort {
    fn open(&mut self, bus: i32, _pin_sda: i32, _pin_scl: i32) -> Result<PortHandle> {
        let mut state = self.state();
        state.open_calls += 1;
        if let Some(err) = state.fail_open {
            return Err(err);
        }
        let handle = Self::insert(
            &mut state,
            MockI2cBus {
                bus,
                adopted: false,
                clock_hertz: None,
            },
        );
        debug!("Mock I2C bus {} opened as {}", bus, handle);
        Ok(handle)
    }

    fn adopt(&mut self, bus: i32) -> Result<PortHandle> {
        let mut state = self.state();
        state.adopt_calls += 1;
        if let Some(err) = state.fail_adopt {
            return Err(err);
        }
        let handle = Self::insert(
            &mut state,
            MockI2cBus {
                bus,
                adopted: true,
                clock_hertz: None,
            },
        );
        debug!("Mock I2C bus {} adopted as {}", bus, handle);
        Ok(handle)
    }

    fn close(&mut self, handle: PortHandle) {
        let mut state = self.state();
        state.close_calls += 1;
        if state.open.remove(&handle).is_none() {
            warn!("Mock I2C close of unknown handle {}", handle);
        }
    }

    fn set_clock(&mut self, handle: PortHandle, hertz: i32) -> Result<()> {
        let mut state = self.state();
        state.set_clock_calls += 1;
        if let Some(err) = state.fail_set_clock {
            return Err(err);
        }
        match state.open.get_mut(&handle) {
            Some(bus) if bus.adopted => Err(Error::NotSupported),
            Some(bus) => {
                bus.clock_hertz = Some(hertz);
                Ok(())
            }
            None => Err(Error::InvalidParameter),
        }
    }
}

#[derive(Debug, Default)]
struct UartState {
    next_handle: i32,
    open: BTreeMap<PortHandle, UartConfig>,
    close_calls: u32,
    fail_open: Option<Error>,
}

/// A mock UART driver; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockUartPort {
    state: Arc<Mutex<UartState>>,
}

impl MockUartPort {
    /// Create a mock with no open UARTs.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, UartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent `open` fail with `error` (`None` restores success).
    pub fn fail_open(&self, error: Option<Error>) {
        self.state().fail_open = error;
    }

    /// Returns `true` if `handle` is currently open.
    pub fn is_open(&self, handle: PortHandle) -> bool {
        self.state().open.contains_key(&handle)
    }

    /// Configuration an open handle was opened with.
    pub fn config(&self, handle: PortHandle) -> Option<UartConfig> {
        self.state().open.get(&handle).cloned()
    }

    /// Number of currently open UARTs.
    pub fn open_port_count(&self) -> usize {
        self.state().open.len()
    }

    /// Number of `close` calls.
    pub fn close_calls(&self) -> u32 {
        self.state().close_calls
    }
}

impl UartPort for MockUartPort {
    fn open(&mut self, config: &UartConfig) -> Result<PortHandle> {
        let mut state = self.state();
        if let Some(err) = state.fail_open {
            return Err(err);
        }
        let handle = PortHandle::new(state.next_handle);
        state.next_handle += 1;
        state.open.insert(handle, config.clone());
        debug!("Mock UART {} opened as {}", config.uart, handle);
        Ok(handle)
    }

    fn close(&mut self, handle: PortHandle) {
        let mut state = self.state();
        state.close_calls += 1;
        if state.open.remove(&handle).is_none() {
            warn!("Mock UART close of unknown handle {}", handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let mock = MockI2cPort::new();
        let mut driver = mock.clone();
        let a = driver.open(0, -1, -1).unwrap();
        let b = driver.open(1, -1, -1).unwrap();
        assert_ne!(a, b);
        assert_eq!(mock.open_port_count(), 2);
        assert_eq!(mock.open_calls(), 2);
        assert_eq!(mock.bus(b).map(|bus| bus.bus), Some(1));
    }

    #[test]
    fn test_failure_injection() {
        let mut mock = MockI2cPort::new();
        mock.fail_open(Some(Error::Platform));
        assert_eq!(mock.open(0, -1, -1), Err(Error::Platform));
        assert_eq!(mock.open_port_count(), 0);

        mock.fail_open(None);
        let handle = mock.open(0, -1, -1).unwrap();
        mock.fail_set_clock(Some(Error::Timeout));
        assert_eq!(mock.set_clock(handle, 400_000), Err(Error::Timeout));
    }

    #[test]
    fn test_adopted_bus_rejects_clock() {
        let mut mock = MockI2cPort::new();
        let handle = mock.adopt(2).unwrap();
        assert_eq!(mock.set_clock(handle, 100_000), Err(Error::NotSupported));
        assert!(mock.bus(handle).unwrap().adopted);
    }

    #[test]
    fn test_set_clock_records_frequency() {
        let mut mock = MockI2cPort::new();
        let handle = mock.open(0, -1, -1).unwrap();
        mock.set_clock(handle, 100_000).unwrap();
        assert_eq!(mock.bus(handle).unwrap().clock_hertz, Some(100_000));
    }

    #[test]
    fn test_uart_open_close() {
        let mock = MockUartPort::new();
        let mut driver = mock.clone();
        let config = UartConfig {
            uart: 2,
            ..Default::default()
        };
        let handle = driver.open(&config).unwrap();
        assert_eq!(mock.config(handle).map(|c| c.uart), Some(2));
        driver.close(handle);
        assert!(!mock.is_open(handle));
        assert_eq!(mock.close_calls(), 1);
    }
}
