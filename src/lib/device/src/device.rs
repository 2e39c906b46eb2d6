use alloc::{boxed::Box, string::String, vec::Vec};
use bitflags::bitflags;
use core::any::Any;
use oreboot_fdt::NodeId;

use crate::{ClassId, DriverModel, Ops, Result};

/// Lifecycle hook run against one device
pub type Hook = fn(&mut DriverModel, DevId) -> Result<()>;

/// Allocator for automatically managed device storage
pub type Alloc = fn() -> Box<dyn Any>;

/// Allocates a default-initialised `T`, for use in the `*_auto` fields
pub fn auto<T: Default + 'static>() -> Box<dyn Any> {
    Box::new(T::default())
}

bitflags! {
    /// Device manager flags
    pub struct DmFlags: u32 {
        /// Driver is active (probed). Cleared when it is removed
        const ACTIVATED = 1 << 0;
        /// Device is bound
        const BOUND = 1 << 1;
        /// Driver plat has been read. Cleared when the device is removed
        const PLATDATA_VALID = 1 << 2;
        /// Device must be probed after it was bound
        const PROBE_AFTER_BIND = 1 << 3;
        /// Probe is in progress; seeing it again means a dependency cycle
        const PROBING = 1 << 4;
        /// Remove is in progress
        const REMOVING = 1 << 5;
        /// Call driver remove function to stop currently active DMA transfers
        /// before the OS is started
        const ACTIVE_DMA = 1 << 6;
        /// Call driver remove function to do some final configuration, before
        /// oreboot exits and the OS is started
        const OS_PREPARE = 1 << 7;
        /// Device is vital to the operation of other devices. It can be
        /// removed after all regular devices are removed.
        const VITAL = 1 << 8;
    }
}

bitflags! {
    /// Selects which devices [`DriverModel::remove_subtree`] removes
    pub struct RemoveFlags: u32 {
        /// Normal remove, remove all devices
        const NORMAL = 1 << 0;
        /// Remove devices with active DMA
        const ACTIVE_DMA = DmFlags::ACTIVE_DMA.bits();
        /// Remove devices which need some final OS preparation steps
        const OS_PREPARE = DmFlags::OS_PREPARE.bits();
        /// Remove only devices that are not marked vital
        const NON_VITAL = DmFlags::VITAL.bits();
        /// Remove devices with any active flag
        const ACTIVE_ALL = Self::ACTIVE_DMA.bits | Self::OS_PREPARE.bits;
    }
}

impl RemoveFlags {
    /// Whether a driver carrying `driver_flags` is removed under these flags
    pub fn selects(&self, driver_flags: DmFlags) -> bool {
        if self.contains(Self::NON_VITAL) && driver_flags.contains(DmFlags::VITAL) {
            return false;
        }
        self.contains(Self::NORMAL)
            || (self.contains(Self::ACTIVE_DMA) && driver_flags.contains(DmFlags::ACTIVE_DMA))
            || (self.contains(Self::OS_PREPARE) && driver_flags.contains(DmFlags::OS_PREPARE))
    }
}

/// Handle on a device held by a [`DriverModel`]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DevId(pub(crate) usize);

/// Where a device is in its lifecycle
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceState {
    Bound,
    Probing,
    Activated,
    Removing,
}

/// An instance of a driver
///
/// This holds information about a device, which is a driver bound to a
/// particular port or peripheral (essentially a driver instance).
///
/// A device comes into existence through a bind, either from a node in the
/// device tree or explicitly by a parent that owns the binding decision. The
/// device tree information is translated into plat by the driver's
/// `of_to_plat` hook, just before the probe hook runs.
///
/// plat, class_plat and parent_plat are allocated at bind time; priv,
/// class_priv and parent_priv live only while the device is activated.
pub struct Device {
    pub(crate) driver: &'static Driver,
    pub(crate) name: String,
    pub(crate) driver_data: u64,
    pub(crate) parent: Option<DevId>,
    pub(crate) children: Vec<DevId>,
    pub(crate) node: Option<NodeId>,
    pub(crate) seq: u32,
    pub(crate) flags: DmFlags,
    pub(crate) plat_: Option<Box<dyn Any>>,
    pub(crate) parent_plat_: Option<Box<dyn Any>>,
    pub(crate) class_plat_: Option<Box<dyn Any>>,
    pub(crate) priv_: Option<Box<dyn Any>>,
    pub(crate) class_priv_: Option<Box<dyn Any>>,
    pub(crate) parent_priv_: Option<Box<dyn Any>>,
}

impl Device {
    pub fn driver(&self) -> &'static Driver {
        self.driver
    }

    pub fn class_id(&self) -> ClassId {
        self.driver.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data word of the match table entry that bound this device
    pub fn driver_data(&self) -> u64 {
        self.driver_data
    }

    pub fn parent(&self) -> Option<DevId> {
        self.parent
    }

    /// Children in bind order
    pub fn children(&self) -> &[DevId] {
        &self.children
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Sequence number, unique within the device's uclass
    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn flags(&self) -> DmFlags {
        self.flags
    }

    pub fn state(&self) -> DeviceState {
        if self.flags.contains(DmFlags::PROBING) {
            DeviceState::Probing
        } else if self.flags.contains(DmFlags::REMOVING) {
            DeviceState::Removing
        } else if self.flags.contains(DmFlags::ACTIVATED) {
            DeviceState::Activated
        } else {
            DeviceState::Bound
        }
    }

    pub fn is_active(&self) -> bool {
        self.flags.contains(DmFlags::ACTIVATED)
    }
}

/// A driver for a feature or peripheral
///
/// This holds methods for setting up a new device, and also removing it.
/// The device needs information to set itself up - this is provided by a
/// device tree node (which we find by looking up matching compatible strings
/// with `of_match`).
///
/// Drivers all belong to a uclass, representing a class of devices of the
/// same type. Common elements of the drivers can be implemented in the uclass,
/// or the uclass can provide a consistent interface to the drivers within
/// it.
pub struct Driver {
    /// Device name
    pub name: &'static str,
    /// Identifies the uclass we belong to
    pub id: ClassId,
    /// List of compatible strings to match, and any identifying data
    /// for each.
    pub of_match: &'static [DeviceId],
    /// Called to bind a device to its driver
    pub bind: Option<Hook>,
    /// Called before probe to decode device tree data
    pub of_to_plat: Option<Hook>,
    /// Called to probe a device, i.e. activate it
    pub probe: Option<Hook>,
    /// Called to remove a device, i.e. de-activate it
    pub remove: Option<Hook>,
    /// Called to unbind a device from its driver
    pub unbind: Option<Hook>,
    /// Called after a new child has been bound
    pub child_post_bind: Option<Hook>,
    /// Called before a child device is probed. The device has
    /// memory allocated but it has not yet been probed.
    pub child_pre_probe: Option<Hook>,
    /// Called after a child device is removed
    pub child_post_remove: Option<Hook>,
    /// Private data allocated in the device's priv while it is active
    pub priv_auto: Option<Alloc>,
    /// Platform data allocated in the device's plat at bind time
    pub plat_auto: Option<Alloc>,
    /// Each child device can hold private data owned by its parent
    pub per_child_auto: Option<Alloc>,
    /// A bus likes to store information about its children, allocated in
    /// the child's parent_plat at bind time
    pub per_child_plat_auto: Option<Alloc>,
    /// The uclass operations table this driver implements
    pub ops: Ops,
    /// driver flags - see [`DmFlags`]
    pub flags: DmFlags,
}

impl Driver {
    pub const fn new() -> Self {
        Self {
            name: "",
            id: ClassId::Root,
            of_match: &[],
            bind: None,
            of_to_plat: None,
            probe: None,
            remove: None,
            unbind: None,
            child_post_bind: None,
            child_pre_probe: None,
            child_post_remove: None,
            priv_auto: None,
            plat_auto: None,
            per_child_auto: None,
            per_child_plat_auto: None,
            ops: Ops::NONE,
            flags: DmFlags::empty(),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Match table entry for the first of `compatible` this driver supports
    pub fn match_compatible(&self, compatible: &str) -> Option<&'static DeviceId> {
        self.of_match.iter().find(|m| m.compatible == compatible)
    }
}

/// Lists the compatible strings supported by a driver
#[derive(Clone, Copy, Debug)]
pub struct DeviceId {
    /// Compatible string
    pub compatible: &'static str,
    /// Data for this compatible string
    pub data: u64,
}

impl DeviceId {
    pub const fn new(compatible: &'static str) -> Self {
        Self::with_data(compatible, 0)
    }

    pub const fn with_data(compatible: &'static str, data: u64) -> Self {
        Self { compatible, data }
    }

    pub fn compatible(&self) -> &str {
        self.compatible
    }

    pub fn data(&self) -> u64 {
        self.data
    }
}
