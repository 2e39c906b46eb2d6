//! Process-wide tables of drivers and uclasses
//!
//! A [`Catalog`] is assembled once at startup from static descriptors and
//! never changes afterwards. Building it checks the invariants the rest of
//! the driver model relies on: every driver's uclass is known, and every
//! operations table belongs to the driver's uclass.

use alloc::{collections::BTreeMap, vec::Vec};
use log::error;
use spin::Once;

use crate::{
    device::Hook,
    root::{ROOT_CLASS, ROOT_DRIVER, SIMPLE_BUS_CLASS, SIMPLE_BUS_DRIVER},
    ClassDriver, ClassId, Driver, ErrorKind, Result,
};

static CATALOG: Once<Catalog> = Once::new();

/// Read-only driver and uclass tables
pub struct Catalog {
    drivers: Vec<&'static Driver>,
    classes: BTreeMap<ClassId, &'static ClassDriver>,
    state_hook: Option<Hook>,
}

impl Catalog {
    /// A builder already holding the built-in root and simple-bus drivers
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder {
            drivers: alloc::vec![&ROOT_DRIVER, &SIMPLE_BUS_DRIVER],
            classes: alloc::vec![&ROOT_CLASS, &SIMPLE_BUS_CLASS],
            state_hook: None,
        }
    }

    /// Find the driver for a node's compatible list
    ///
    /// The node's strings are tried in order and, for each, the drivers in
    /// registration order; the first hit wins. Also returns the data word of
    /// the matching entry.
    pub fn find_driver_by_compatible(&self, compatible: &[&str]) -> Option<(&'static Driver, u64)> {
        compatible.iter().find_map(|compat| {
            self.drivers
                .iter()
                .find_map(|drv| drv.match_compatible(compat).map(|m| (*drv, m.data)))
        })
    }

    pub fn find_driver_by_name(&self, name: &str) -> Option<&'static Driver> {
        self.drivers.iter().copied().find(|drv| drv.name == name)
    }

    pub fn get_uclass(&self, id: ClassId) -> Result<&'static ClassDriver> {
        self.classes.get(&id).copied().ok_or_else(|| {
            error!("dm: unknown uclass {:?}", id);
            ErrorKind::UnknownUclass
        })
    }

    pub fn drivers(&self) -> &[&'static Driver] {
        &self.drivers
    }

    /// Hook applying a device's default pin state before it is probed
    pub fn state_hook(&self) -> Option<Hook> {
        self.state_hook
    }
}

/// Collects descriptors and validates them into a [`Catalog`]
pub struct CatalogBuilder {
    drivers: Vec<&'static Driver>,
    classes: Vec<&'static ClassDriver>,
    state_hook: Option<Hook>,
}

impl CatalogBuilder {
    pub fn class(mut self, class: &'static ClassDriver) -> Self {
        self.classes.push(class);
        self
    }

    pub fn driver(mut self, driver: &'static Driver) -> Self {
        self.drivers.push(driver);
        self
    }

    pub fn drivers(mut self, drivers: &[&'static Driver]) -> Self {
        self.drivers.extend_from_slice(drivers);
        self
    }

    pub fn state_hook(mut self, hook: Hook) -> Self {
        self.state_hook = Some(hook);
        self
    }

    pub fn build(self) -> Result<Catalog> {
        let mut classes = BTreeMap::new();
        for class in self.classes {
            if classes.insert(class.id, class).is_some() {
                error!("dm: uclass {:?} registered twice", class.id);
                return Err(ErrorKind::DuplicateIdentity);
            }
        }

        for (i, drv) in self.drivers.iter().enumerate() {
            if !classes.contains_key(&drv.id) {
                error!("dm: driver '{}' uses unknown uclass {:?}", drv.name, drv.id);
                return Err(ErrorKind::UnknownUclass);
            }
            if let Some(class) = drv.ops.class() {
                if class != drv.id {
                    error!(
                        "dm: driver '{}' in uclass {:?} has {:?} operations",
                        drv.name, drv.id, class
                    );
                    return Err(ErrorKind::OpsMismatch);
                }
            }
            if self.drivers[..i].iter().any(|other| other.name == drv.name) {
                error!("dm: driver '{}' registered twice", drv.name);
                return Err(ErrorKind::DuplicateIdentity);
            }
        }

        Ok(Catalog {
            drivers: self.drivers,
            classes,
            state_hook: self.state_hook,
        })
    }
}

/// Install the process-wide catalog, built on first use
///
/// Later calls return the catalog installed by the first successful one.
pub fn install(build: impl FnOnce() -> Result<Catalog>) -> Result<&'static Catalog> {
    CATALOG.try_call_once(build)
}

/// The installed catalog, if any
pub fn installed() -> Option<&'static Catalog> {
    CATALOG.get()
}
