//! Device instance store.
//!
//! A fixed-capacity arena of device instances. Each slot carries a
//! generation counter that moves on whenever its instance is destroyed, and
//! every [`DeviceHandle`] records the store it came from plus the slot
//! generation it was issued at. A handle that is stale (its device was
//! closed) or foreign (issued by another store) therefore fails validation
//! instead of reaching whatever now occupies the slot.

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, warn};

use radiolink_types::{DeviceHandle, DeviceType};

use crate::error::{Error, Result};

/// Default number of devices a store can hold.
pub const DEVICE_CAPACITY_DEFAULT: usize = 16;

static NEXT_STORE_ID: AtomicU32 = AtomicU32::new(1);

/// One attached logical device.
///
/// `context` belongs to the family implementation that created the device;
/// the store never looks inside it.
#[derive(Debug)]
pub struct DeviceInstance<C> {
    device_type: DeviceType,
    /// Module type within the family, stamped from the open configuration.
    pub module_type: i32,
    /// Family-private state.
    pub context: C,
}

impl<C> DeviceInstance<C> {
    /// The family this instance belongs to.
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }
}

#[derive(Debug)]
struct Slot<C> {
    generation: u32,
    instance: Option<DeviceInstance<C>>,
}

/// Generation-checked arena of [`DeviceInstance`]s.
#[derive(Debug)]
pub struct DeviceStore<C> {
    id: u32,
    slots: Box<[Slot<C>]>,
    live: usize,
}

impl<C> DeviceStore<C> {
    /// Create a store able to hold `capacity` devices at once.
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                instance: None,
            })
            .collect();
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            slots,
            live: 0,
        }
    }

    /// Create an instance of `device_type` owning `context`.
    ///
    /// Fails with [`Error::NoMemory`] when every slot is taken.
    pub fn create(&mut self, device_type: DeviceType, context: C) -> Result<DeviceHandle> {
        let Some((index, slot)) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.instance.is_none())
        else {
            warn!("Device store full ({} devices)", self.live);
            return Err(Error::NoMemory);
        };

        slot.instance = Some(DeviceInstance {
            device_type,
            module_type: 0,
            context,
        });
        self.live += 1;

        // Slot count is bounded by configuration far below u32::MAX.
        let handle = DeviceHandle::from_parts(self.id, index as u32, slot.generation);
        debug!("Created {} instance {}", device_type, handle);
        Ok(handle)
    }

    fn slot(&self, handle: DeviceHandle) -> Option<&Slot<C>> {
        if handle.store() != self.id {
            return None;
        }
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
    }

    fn slot_mut(&mut self, handle: DeviceHandle) -> Option<&mut Slot<C>> {
        if handle.store() != self.id {
            return None;
        }
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
    }

    /// Returns `true` if `handle` refers to a live instance of this store.
    pub fn is_valid(&self, handle: DeviceHandle) -> bool {
        self.get(handle).is_some()
    }

    /// The live instance behind `handle`.
    pub fn get(&self, handle: DeviceHandle) -> Option<&DeviceInstance<C>> {
        self.slot(handle).and_then(|slot| slot.instance.as_ref())
    }

    /// The live instance behind `handle`, mutably.
    pub fn get_mut(&mut self, handle: DeviceHandle) -> Option<&mut DeviceInstance<C>> {
        self.slot_mut(handle).and_then(|slot| slot.instance.as_mut())
    }

    /// Destroy the instance behind `handle` and hand back its contents.
    ///
    /// A stale or foreign handle is reported and otherwise ignored: nothing
    /// is freed twice.
    pub fn destroy(&mut self, handle: DeviceHandle) -> Option<DeviceInstance<C>> {
        let instance = self.slot_mut(handle).and_then(|slot| {
            let instance = slot.instance.take()?;
            slot.generation = slot.generation.wrapping_add(1);
            Some(instance)
        });

        match instance {
            Some(instance) => {
                self.live -= 1;
                debug!("Destroyed {} instance {}", instance.device_type, handle);
                Some(instance)
            }
            None => {
                warn!("Attempt to destroy invalid device handle {}", handle);
                None
            }
        }
    }

    /// Device type behind `handle`.
    pub fn device_type(&self, handle: DeviceHandle) -> Result<DeviceType> {
        self.get(handle)
            .map(DeviceInstance::device_type)
            .ok_or(Error::InvalidParameter)
    }

    /// Handles of every live instance of `device_type`.
    pub fn handles_of(&self, device_type: DeviceType) -> Vec<DeviceHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let instance = slot.instance.as_ref()?;
                (instance.device_type == device_type)
                    .then(|| DeviceHandle::from_parts(self.id, index as u32, slot.generation))
            })
            .collect()
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no instance is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Maximum number of simultaneous instances.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
