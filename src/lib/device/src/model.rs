//! The device registry
//!
//! [`DriverModel`] owns every bound device in an arena indexed by [`DevId`].
//! Parent links are plain indices and never own anything; a device is listed
//! in exactly one parent's children (or the root list) and exactly one
//! uclass, from creation until it is destroyed.

use alloc::{boxed::Box, collections::BTreeMap, rc::Rc, string::String, vec::Vec};
use log::{debug, error};
use oreboot_fdt::{NodeId, Ofnode, Tree};

use crate::{
    class::Class,
    timer::{Delay, SpinDelay},
    Catalog, ClassDriver, ClassId, DevId, Device, DmFlags, Driver, ErrorKind, Result,
};

/// The driver model: catalog, hardware description and bound devices
pub struct DriverModel {
    catalog: &'static Catalog,
    tree: Rc<Tree>,
    devices: Vec<Option<Device>>,
    roots: Vec<DevId>,
    classes: BTreeMap<ClassId, Class>,
    root: Option<DevId>,
    delay: Box<dyn Delay>,
}

macro_rules! storage_accessors {
    ($($(#[$meta:meta])* $get:ident, $get_mut:ident => $field:ident;)*) => {
        $(
            $(#[$meta])*
            pub fn $get<T: 'static>(&self, dev: DevId) -> Option<&T> {
                self.device(dev)?.$field.as_deref()?.downcast_ref()
            }

            pub fn $get_mut<T: 'static>(&mut self, dev: DevId) -> Option<&mut T> {
                self.device_mut(dev)?.$field.as_deref_mut()?.downcast_mut()
            }
        )*
    };
}

impl DriverModel {
    pub fn new(catalog: &'static Catalog, tree: Tree) -> Self {
        Self {
            catalog,
            tree: Rc::new(tree),
            devices: Vec::new(),
            roots: Vec::new(),
            classes: BTreeMap::new(),
            root: None,
            delay: Box::new(SpinDelay),
        }
    }

    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    pub fn tree(&self) -> &Rc<Tree> {
        &self.tree
    }

    /// The root device, once [`DriverModel::init`] has run
    pub fn root(&self) -> Option<DevId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: DevId) {
        self.root = Some(root);
    }

    /// Devices created without a parent
    pub fn roots(&self) -> &[DevId] {
        &self.roots
    }

    pub fn set_delay(&mut self, delay: Box<dyn Delay>) {
        self.delay = delay;
    }

    pub fn udelay(&self, us: u32) {
        if us > 0 {
            self.delay.udelay(us);
        }
    }

    pub fn device(&self, dev: DevId) -> Option<&Device> {
        self.devices.get(dev.0)?.as_ref()
    }

    fn device_mut(&mut self, dev: DevId) -> Option<&mut Device> {
        self.devices.get_mut(dev.0)?.as_mut()
    }

    pub(crate) fn dev(&self, dev: DevId) -> Result<&Device> {
        self.device(dev).ok_or(ErrorKind::NotFound)
    }

    pub(crate) fn dev_mut(&mut self, dev: DevId) -> Result<&mut Device> {
        self.device_mut(dev).ok_or(ErrorKind::NotFound)
    }

    /// Every live device, in creation order
    pub fn devices(&self) -> impl Iterator<Item = DevId> + '_ {
        self.devices
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_some())
            .map(|(i, _)| DevId(i))
    }

    pub fn name(&self, dev: DevId) -> &str {
        self.device(dev).map_or("<unbound>", Device::name)
    }

    pub fn ofnode(&self, dev: DevId) -> Option<Ofnode> {
        let node = self.device(dev)?.node?;
        Some(Ofnode::new(self.tree.clone(), node))
    }

    pub fn class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(&id)
    }

    pub fn class_driver(&self, dev: DevId) -> Result<&'static ClassDriver> {
        self.catalog.get_uclass(self.dev(dev)?.driver.id)
    }

    pub(crate) fn class_ids(&self) -> Vec<ClassId> {
        self.classes.keys().copied().collect()
    }

    pub(crate) fn drop_class(&mut self, id: ClassId) {
        self.classes.remove(&id);
    }

    /// Get the runtime uclass, creating it on first use
    pub(crate) fn class_get(&mut self, id: ClassId) -> Result<&mut Class> {
        if !self.classes.contains_key(&id) {
            let driver = self.catalog.get_uclass(id)?;
            self.classes.insert(id, Class::new(driver));
            if let Some(init) = driver.init {
                if let Err(e) = init(self, id) {
                    error!("dm: uclass '{}' init failed: {}", driver.name, e);
                    self.classes.remove(&id);
                    return Err(e);
                }
            }
        }
        self.classes.get_mut(&id).ok_or(ErrorKind::UnknownUclass)
    }

    storage_accessors! {
        /// Driver platform data
        plat, plat_mut => plat_;
        /// Data the parent keeps about this child, allocated at bind time
        parent_plat, parent_plat_mut => parent_plat_;
        /// Uclass platform data, laid out the same for every driver in the uclass
        uclass_plat, uclass_plat_mut => class_plat_;
        /// Driver private data, present while the device is active
        priv_, priv_mut => priv_;
        /// Uclass private data, present while the device is active
        uclass_priv, uclass_priv_mut => class_priv_;
        /// Parent-owned private data, present while the device is active
        parent_priv, parent_priv_mut => parent_priv_;
    }

    /// Uclass-wide private data
    pub fn class_priv<T: 'static>(&self, id: ClassId) -> Option<&T> {
        self.classes.get(&id)?.priv_.as_deref()?.downcast_ref()
    }

    pub fn class_priv_mut<T: 'static>(&mut self, id: ClassId) -> Option<&mut T> {
        self.classes.get_mut(&id)?.priv_.as_deref_mut()?.downcast_mut()
    }

    fn alloc_seq(&self, class: &ClassDriver, node: Option<NodeId>) -> u32 {
        let by_alias = cfg!(feature = "seq_alias")
            && class.flags.contains(crate::ClassFlags::SEQ_ALIAS);
        if by_alias {
            if let Some(seq) = node.and_then(|n| self.tree.alias_id(class.name, n)) {
                return seq;
            }
        }

        let mut next = if by_alias {
            self.tree.alias_highest_id(class.name).map_or(0, |id| id + 1)
        } else {
            0
        };
        if let Some(c) = self.classes.get(&class.id) {
            for dev in c.devices.iter().filter_map(|d| self.device(*d)) {
                next = next.max(dev.seq + 1);
            }
        }
        next
    }

    /// Allocate a device and link it into its parent and uclass
    ///
    /// plat, uclass plat and parent plat are allocated here, empty and sized
    /// by the driver, uclass and parent respectively. No hook runs.
    pub fn create_device(
        &mut self,
        parent: Option<DevId>,
        driver: &'static Driver,
        name: &str,
        driver_data: u64,
        node: Option<NodeId>,
    ) -> Result<DevId> {
        let class = self.class_get(driver.id)?.driver;

        let parent_plat = match parent {
            Some(p) => {
                let pdrv = self.dev(p)?.driver;
                let pclass = self.class_driver(p)?;
                pdrv.per_child_plat_auto.or(pclass.per_child_plat_auto)
            }
            None => None,
        };

        self.devices
            .try_reserve(1)
            .map_err(|_| ErrorKind::OutOfMemory)?;
        let id = DevId(self.devices.len());
        let seq = self.alloc_seq(class, node);

        let mut name_buf = String::new();
        name_buf
            .try_reserve(name.len())
            .map_err(|_| ErrorKind::OutOfMemory)?;
        name_buf.push_str(name);

        self.devices.push(Some(Device {
            driver,
            name: name_buf,
            driver_data,
            parent,
            children: Vec::new(),
            node,
            seq,
            flags: DmFlags::BOUND | (driver.flags & DmFlags::PROBE_AFTER_BIND),
            plat_: driver.plat_auto.map(|alloc| alloc()),
            parent_plat_: parent_plat.map(|alloc| alloc()),
            class_plat_: class.per_device_plat_auto.map(|alloc| alloc()),
            priv_: None,
            class_priv_: None,
            parent_priv_: None,
        }));

        match parent {
            Some(p) => self.dev_mut(p)?.children.push(id),
            None => self.roots.push(id),
        }
        self.class_get(driver.id)?.devices.push(id);

        debug!("dm: created '{}' ({}, seq {})", name, driver.name, seq);
        Ok(id)
    }

    /// Unlink and free a device that has no children left
    pub fn destroy_device(&mut self, dev: DevId) -> Result<()> {
        let device = self.dev(dev)?;
        if !device.children.is_empty() {
            error!("dm: '{}' still has children", device.name);
            return Err(ErrorKind::HasChildren);
        }
        let parent = device.parent;
        let class = device.driver.id;

        match parent {
            Some(p) => self.dev_mut(p)?.children.retain(|c| *c != dev),
            None => self.roots.retain(|c| *c != dev),
        }
        if let Some(c) = self.classes.get_mut(&class) {
            c.devices.retain(|d| *d != dev);
        }
        if self.root == Some(dev) {
            self.root = None;
        }
        if let Some(device) = self.devices.get_mut(dev.0).and_then(Option::take) {
            debug!("dm: destroyed '{}'", device.name);
        }
        Ok(())
    }

    pub(crate) fn set_flags(&mut self, dev: DevId, flags: DmFlags) -> Result<()> {
        self.dev_mut(dev)?.flags.insert(flags);
        Ok(())
    }

    pub(crate) fn clear_flags(&mut self, dev: DevId, flags: DmFlags) -> Result<()> {
        self.dev_mut(dev)?.flags.remove(flags);
        Ok(())
    }

    /// Request that a device is probed right after binding completes
    pub fn set_probe_after_bind(&mut self, dev: DevId) -> Result<()> {
        self.set_flags(dev, DmFlags::PROBE_AFTER_BIND)
    }

    /// Allocate the storage that only exists while a device is active
    pub(crate) fn alloc_active_storage(&mut self, dev: DevId) -> Result<()> {
        let driver = self.dev(dev)?.driver;
        let class = self.class_driver(dev)?;
        let per_child = match self.dev(dev)?.parent {
            Some(p) => {
                let pdrv = self.dev(p)?.driver;
                pdrv.per_child_auto.or(self.class_driver(p)?.per_child_auto)
            }
            None => None,
        };

        let device = self.dev_mut(dev)?;
        if device.priv_.is_none() {
            device.priv_ = driver.priv_auto.map(|alloc| alloc());
        }
        if device.class_priv_.is_none() {
            device.class_priv_ = class.per_device_auto.map(|alloc| alloc());
        }
        if device.parent_priv_.is_none() {
            device.parent_priv_ = per_child.map(|alloc| alloc());
        }
        Ok(())
    }

    pub(crate) fn free_active_storage(&mut self, dev: DevId) -> Result<()> {
        let device = self.dev_mut(dev)?;
        device.priv_ = None;
        device.class_priv_ = None;
        device.parent_priv_ = None;
        Ok(())
    }
}
