use alloc::{boxed::Box, vec::Vec};
use bitflags::bitflags;
use core::any::Any;

use crate::{device::{Alloc, Hook}, ClassId, DevId, DriverModel, Result};

/// Hook run once for a whole uclass
pub type ClassHook = fn(&mut DriverModel, ClassId) -> Result<()>;

bitflags! {
    /// Flags for a [`ClassDriver`]
    pub struct ClassFlags: u32 {
        /// Devices in this uclass take their sequence number from aliases
        const SEQ_ALIAS = 1 << 0;
    }
}

/// An oreboot driver class, collecting together similar drivers
///
/// A `Class` provides an interface to a particular function, which is
/// implemented by one or more drivers. Every driver belongs to a uclass even
/// if it is the only driver in that uclass. An example uclass is GPIO, which
/// provides the ability to change read inputs, set and clear outputs, etc.
/// There may be drivers for on-chip SoC GPIO banks, I2C GPIO expanders and
/// PMIC IO lines, all made available in a unified way through the uclass.
pub struct Class {
    /// Private data for this `Class` (do not access outside driver model)
    pub(crate) priv_: Option<Box<dyn Any>>,
    /// The driver for the `Class` itself, not to be confused with a `Driver`
    pub(crate) driver: &'static ClassDriver,
    /// Devices in this `Class`, in bind order
    pub(crate) devices: Vec<DevId>,
}

impl Class {
    pub(crate) fn new(driver: &'static ClassDriver) -> Self {
        Self {
            priv_: driver.priv_auto.map(|alloc| alloc()),
            driver,
            devices: Vec::new(),
        }
    }

    pub fn driver(&self) -> &'static ClassDriver {
        self.driver
    }

    pub fn devices(&self) -> &[DevId] {
        &self.devices
    }
}

/// Driver for the `Class`
///
/// A `ClassDriver` provides a consistent interface to a set of related
/// drivers. Its hooks run around every device of the class, whichever driver
/// the device is bound to.
pub struct ClassDriver {
    /// Name of `ClassDriver`, also the stem of its aliases
    pub name: &'static str,
    /// ID number of this `Class`
    pub id: ClassId,
    /// Called after a new device is bound to this uclass
    pub post_bind: Option<Hook>,
    /// Called before a device is unbound from this uclass
    pub pre_unbind: Option<Hook>,
    /// Called before a new device is probed
    pub pre_probe: Option<Hook>,
    /// Called after a new device is probed
    pub post_probe: Option<Hook>,
    /// Called before a device is removed
    pub pre_remove: Option<Hook>,
    /// Called after a child in this uclass is bound
    pub child_post_bind: Option<Hook>,
    /// Called before a child in this uclass is probed
    pub child_pre_probe: Option<Hook>,
    /// Called after a child in this uclass is probed
    pub child_post_probe: Option<Hook>,
    /// Called to set up the uclass
    pub init: Option<ClassHook>,
    /// Called to destroy the uclass
    pub destroy: Option<ClassHook>,
    /// Private data allocated in the `Class` itself
    pub priv_auto: Option<Alloc>,
    /// Each device can hold private data owned by the `Class`, allocated
    /// while the device is active.
    pub per_device_auto: Option<Alloc>,
    /// Each device can hold platform data owned by the uclass as
    /// 'dev.class_plat', allocated at bind time.
    pub per_device_plat_auto: Option<Alloc>,
    /// Each child device (of a parent in this `Class`) can hold parent data
    /// for the `Device`/`Class`. This value is only used as a fallback if this
    /// member is `None` in the driver.
    pub per_child_auto: Option<Alloc>,
    /// A bus likes to store information about its children. This value is
    /// only used as a fallback if this member is `None` in the driver.
    pub per_child_plat_auto: Option<Alloc>,
    /// Flags for this `Class`, see [`ClassFlags`]
    pub flags: ClassFlags,
}

impl ClassDriver {
    pub const fn new() -> Self {
        Self {
            name: "",
            id: ClassId::Root,
            post_bind: None,
            pre_unbind: None,
            pre_probe: None,
            post_probe: None,
            pre_remove: None,
            child_post_bind: None,
            child_pre_probe: None,
            child_post_probe: None,
            init: None,
            destroy: None,
            priv_auto: None,
            per_device_auto: None,
            per_device_plat_auto: None,
            per_child_auto: None,
            per_child_plat_auto: None,
            flags: ClassFlags::empty(),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn flags(&self) -> ClassFlags {
        self.flags
    }
}
