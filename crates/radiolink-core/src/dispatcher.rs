//! Routing of device operations to their family.
//!
//! The set of families is closed, so [`Family`] is a plain enum over the
//! implementations and [`Dispatcher`] keeps one per [`DeviceType`], indexed
//! by [`DeviceType::index`].

use tracing::{debug, warn};

use radiolink_types::{DeviceConfig, DeviceHandle, DeviceType};

use crate::config::FamilySwitches;
use crate::error::{Error, Result};
use crate::family::{CellFamily, DeviceFamily, GnssFamily, Lifecycle, Resources, ShortRangeFamily};

/// One family implementation.
#[derive(Debug)]
pub enum Family {
    /// Cellular.
    Cell(CellFamily),
    /// GNSS.
    Gnss(GnssFamily),
    /// Short-range, external or open CPU.
    ShortRange(ShortRangeFamily),
}

impl Family {
    fn as_dyn(&self) -> &dyn DeviceFamily {
        match self {
            Family::Cell(family) => family,
            Family::Gnss(family) => family,
            Family::ShortRange(family) => family,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn DeviceFamily {
        match self {
            Family::Cell(family) => family,
            Family::Gnss(family) => family,
            Family::ShortRange(family) => family,
        }
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut crate::family::FamilyState {
        match self {
            Family::Cell(family) => family.state_mut(),
            Family::Gnss(family) => family.state_mut(),
            Family::ShortRange(family) => family.state_mut(),
        }
    }
}

impl DeviceFamily for Family {
    fn device_type(&self) -> DeviceType {
        self.as_dyn().device_type()
    }

    fn init(&mut self) -> Result<()> {
        self.as_dyn_mut().init()
    }

    fn deinit(&mut self, res: &mut Resources<'_>) {
        self.as_dyn_mut().deinit(res)
    }

    fn add(&mut self, config: &DeviceConfig, res: &mut Resources<'_>) -> Result<DeviceHandle> {
        self.as_dyn_mut().add(config, res)
    }

    fn remove(&mut self, handle: DeviceHandle, power_off: bool, res: &mut Resources<'_>) -> Result<()> {
        self.as_dyn_mut().remove(handle, power_off, res)
    }

    fn lifecycle(&self) -> Lifecycle {
        self.as_dyn().lifecycle()
    }
}

/// The four families, addressed by device type.
#[derive(Debug)]
pub struct Dispatcher {
    families: [Family; 4],
}

impl Dispatcher {
    /// Build every family, switching off those absent from `switches`.
    pub fn new(switches: &FamilySwitches) -> Self {
        Self {
            families: [
                Family::Cell(CellFamily::new(switches.cell)),
                Family::Gnss(GnssFamily::new(switches.gnss)),
                Family::ShortRange(ShortRangeFamily::new(false, switches.short_range)),
                Family::ShortRange(ShortRangeFamily::new(true, switches.short_range_open_cpu)),
            ],
        }
    }

    /// The family serving `device_type`.
    pub fn family(&self, device_type: DeviceType) -> &Family {
        &self.families[device_type.index()]
    }

    fn family_mut(&mut self, device_type: DeviceType) -> &mut Family {
        &mut self.families[device_type.index()]
    }

    /// Initialise every family in device-type order.
    ///
    /// A family answering [`Error::NotImplemented`] is absent from this build
    /// and skipped. Any other failure stops the sequence and is returned;
    /// families initialised before it stay initialised.
    pub fn init_all(&mut self) -> Result<()> {
        for family in self.families.iter_mut() {
            match family.init() {
                Ok(()) => {}
                Err(Error::NotImplemented) => {
                    debug!("Skipping absent {} family", family.device_type());
                }
                Err(err) => {
                    warn!("Initialising {} family failed: {}", family.device_type(), err);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Deinitialise every family, last first.
    pub fn deinit_all(&mut self, res: &mut Resources<'_>) {
        for family in self.families.iter_mut().rev() {
            family.deinit(res);
        }
    }

    /// Open a device with the family named by `config.device_type`.
    pub fn add(&mut self, config: &DeviceConfig, res: &mut Resources<'_>) -> Result<DeviceHandle> {
        self.family_mut(config.device_type).add(config, res)
    }

    /// Close a device with the family that owns it.
    pub fn remove(&mut self, handle: DeviceHandle, power_off: bool, res: &mut Resources<'_>) -> Result<()> {
        let device_type = res.store.device_type(handle)?;
        self.family_mut(device_type).remove(handle, power_off, res)
    }

    /// Returns `true` if `device_type`'s family is initialised.
    pub fn is_present(&self, device_type: DeviceType) -> bool {
        self.family(device_type).lifecycle() == Lifecycle::Initialised
    }

    #[cfg(test)]
    pub(crate) fn inject_init_failure(&mut self, device_type: DeviceType, err: Option<Error>) {
        self.family_mut(device_type).state_mut().inject_init_failure(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::testing::Fixture;

    fn all_on() -> Dispatcher {
        Dispatcher::new(&FamilySwitches::default())
    }

    #[test]
    fn test_families_indexed_by_type() {
        let dispatcher = all_on();
        for ty in DeviceType::ALL {
            assert_eq!(dispatcher.family(ty).device_type(), ty);
        }
    }

    #[test]
    fn test_init_tolerates_absent_family() {
        let mut dispatcher = Dispatcher::new(&FamilySwitches {
            gnss: false,
            ..Default::default()
        });
        dispatcher.init_all().unwrap();
        assert!(dispatcher.is_present(DeviceType::Cell));
        assert!(!dispatcher.is_present(DeviceType::Gnss));
        assert!(dispatcher.is_present(DeviceType::ShortRangeOpenCpu));
    }

    #[test]
    fn test_init_stops_on_hard_failure() {
        let mut dispatcher = all_on();
        dispatcher.inject_init_failure(DeviceType::Gnss, Some(Error::Platform));
        assert_eq!(dispatcher.init_all(), Err(Error::Platform));
        assert!(dispatcher.is_present(DeviceType::Cell));
        assert!(!dispatcher.is_present(DeviceType::ShortRange));
    }

    #[test]
    fn test_add_and_remove_route_by_type() {
        let mut fx = Fixture::new(4);
        let mut dispatcher = all_on();
        dispatcher.init_all().unwrap();

        let cell = dispatcher
            .add(&DeviceConfig::defaults(DeviceType::Cell), &mut fx.res())
            .unwrap();
        let gnss = dispatcher
            .add(&DeviceConfig::defaults(DeviceType::Gnss), &mut fx.res())
            .unwrap();
        assert_eq!(fx.store.device_type(cell), Ok(DeviceType::Cell));
        assert_eq!(fx.store.device_type(gnss), Ok(DeviceType::Gnss));

        dispatcher.remove(gnss, false, &mut fx.res()).unwrap();
        dispatcher.remove(cell, true, &mut fx.res()).unwrap();
        assert!(fx.store.is_empty());
        assert_eq!(
            dispatcher.remove(cell, false, &mut fx.res()),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn test_add_to_absent_family_not_initialised() {
        let mut fx = Fixture::new(4);
        let mut dispatcher = Dispatcher::new(&FamilySwitches {
            cell: false,
            ..Default::default()
        });
        dispatcher.init_all().unwrap();
        assert_eq!(
            dispatcher.add(&DeviceConfig::defaults(DeviceType::Cell), &mut fx.res()),
            Err(Error::NotInitialised)
        );
    }

    #[test]
    fn test_deinit_all_closes_everything() {
        let mut fx = Fixture::new(8);
        let uart = fx.uart.clone();
        let i2c = fx.i2c.clone();
        let mut dispatcher = all_on();
        dispatcher.init_all().unwrap();
        for ty in DeviceType::ALL {
            dispatcher.add(&DeviceConfig::defaults(ty), &mut fx.res()).unwrap();
        }

        dispatcher.deinit_all(&mut fx.res());
        assert!(fx.store.is_empty());
        assert!(fx.arbiter.is_idle());
        assert_eq!(uart.open_port_count(), 0);
        assert_eq!(i2c.open_port_count(), 0);
        assert!(DeviceType::ALL.iter().all(|ty| !dispatcher.is_present(*ty)));
    }
}
