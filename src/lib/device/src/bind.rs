//! Binding: turning hardware description nodes into devices

use alloc::{format, string::String, vec::Vec};
use log::{debug, error, info, warn};
use oreboot_fdt::{NodeId, Ofnode};

use crate::{
    root::ROOT_DRIVER, DevId, DmFlags, Driver, DriverModel, ErrorKind, RemoveFlags, Result,
};

/// Outcome of binding a list of subnodes as children of one device
///
/// Binding goes on past individual failures; `errors` keeps them in the
/// order they happened.
#[derive(Debug, Default)]
pub struct SubnodeBinding {
    pub bound: Vec<DevId>,
    pub errors: Vec<(NodeId, ErrorKind)>,
}

impl SubnodeBinding {
    pub fn first_error(&self) -> Option<ErrorKind> {
        self.errors.first().map(|(_, e)| *e)
    }
}

impl DriverModel {
    /// Bind and probe the root device
    pub fn init(&mut self) -> Result<DevId> {
        if let Some(root) = self.root() {
            return Ok(root);
        }
        let node = self.tree().root();
        let root = self.device_bind(None, &ROOT_DRIVER, ROOT_DRIVER.name, 0, Some(node))?;
        self.set_root(root);
        self.probe(root)?;
        Ok(root)
    }

    /// Bind every top-level node below the root device
    ///
    /// Buses bind their own children as they are bound, so devices appear in
    /// document pre-order. A node that fails to bind does not stop its
    /// siblings; the first failure is returned once the scan is complete.
    pub fn scan(&mut self) -> Result<()> {
        let root = self.root().ok_or(ErrorKind::InvalidState)?;
        let node = self.tree().root();
        self.scan_node_children(root, node)
    }

    /// Probe every device that asked to be probed right after binding
    pub fn probe_after_bind(&mut self) -> Result<()> {
        let pending: Vec<DevId> = self
            .devices()
            .filter(|d| {
                self.device(*d).is_some_and(|dev| {
                    dev.flags().contains(DmFlags::PROBE_AFTER_BIND) && !dev.is_active()
                })
            })
            .collect();

        let mut first = None;
        for dev in pending {
            if let Err(e) = self.probe(dev) {
                warn!("{}: probe after bind failed: {}", self.name(dev), e);
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Bring the model up: root, tree scan, probe-after-bind devices
    ///
    /// Failures of individual devices are logged and the boot goes on; the
    /// first one is returned at the end. Running out of memory stops at once.
    pub fn init_and_scan(&mut self) -> Result<()> {
        self.init()?;
        let mut first = None;
        for step in [Self::scan, Self::probe_after_bind] {
            match step(self) {
                Err(ErrorKind::OutOfMemory) => return Err(ErrorKind::OutOfMemory),
                Err(e) => {
                    first.get_or_insert(e);
                }
                Ok(()) => {}
            }
        }
        info!("dm: {} devices bound", self.devices().count());
        first.map_or(Ok(()), Err)
    }

    /// Bind `driver` to a new device and run the bind hooks
    ///
    /// Hook order: parent uclass `child_post_bind`, driver `bind`, parent
    /// driver `child_post_bind`, uclass `post_bind`. If any of them fails the
    /// device is torn down again, with anything it bound below itself, and
    /// the error is returned.
    pub fn device_bind(
        &mut self,
        parent: Option<DevId>,
        driver: &'static Driver,
        name: &str,
        driver_data: u64,
        node: Option<NodeId>,
    ) -> Result<DevId> {
        let dev = self.create_device(parent, driver, name, driver_data, node)?;

        let mut bound = false;
        if let Err(e) = self.run_bind_hooks(dev, &mut bound) {
            error!("dm: failed to bind '{}' ({}): {}", name, driver.name, e);
            self.discard(dev, bound);
            return Err(e);
        }

        debug!("dm: bound '{}' to {}", name, driver.name);
        Ok(dev)
    }

    fn run_bind_hooks(&mut self, dev: DevId, bound: &mut bool) -> Result<()> {
        let driver = self.dev(dev)?.driver();
        let class = self.class_driver(dev)?;
        let parent = self.dev(dev)?.parent();

        if let Some(p) = parent {
            if let Some(hook) = self.class_driver(p)?.child_post_bind {
                hook(self, dev)?;
            }
        }
        if let Some(hook) = driver.bind {
            hook(self, dev)?;
        }
        *bound = true;
        if let Some(p) = parent {
            if let Some(hook) = self.dev(p)?.driver().child_post_bind {
                hook(self, dev)?;
            }
        }
        if let Some(hook) = class.post_bind {
            hook(self, dev)?;
        }
        Ok(())
    }

    /// Undo a bind that failed part way
    fn discard(&mut self, dev: DevId, bound: bool) {
        let children = self.device(dev).map(|d| d.children().to_vec()).unwrap_or_default();
        for child in children {
            if let Err(e) = self
                .remove_subtree(child, RemoveFlags::NORMAL)
                .and_then(|()| self.unbind(child))
            {
                warn!("{}: cannot drop child: {}", self.name(child), e);
            }
        }
        if bound {
            let unbind = self.device(dev).and_then(|d| d.driver().unbind);
            if let Some(hook) = unbind {
                if let Err(e) = hook(self, dev) {
                    warn!("{}: unbind after failed bind: {}", self.name(dev), e);
                }
            }
        }
        if let Err(e) = self.destroy_device(dev) {
            warn!("dm: cannot destroy device: {}", e);
        }
    }

    /// Bind one node below `parent` if a driver matches it
    ///
    /// Disabled nodes, nodes without a `compatible` property and nodes no
    /// driver matches produce `Ok(None)`.
    pub fn bind_node(&mut self, parent: DevId, node: NodeId) -> Result<Option<DevId>> {
        let ofnode = Ofnode::new(self.tree().clone(), node);
        if !ofnode.is_enabled() {
            debug!("dm: {} is disabled", ofnode.path());
            return Ok(None);
        }
        let compatible = ofnode.read_string_list("compatible");
        if compatible.is_empty() {
            return Ok(None);
        }
        let Some((driver, data)) = self.catalog().find_driver_by_compatible(&compatible) else {
            debug!("dm: no driver for {} ({:?})", ofnode.path(), compatible);
            return Ok(None);
        };

        self.device_bind(Some(parent), driver, ofnode.name(), data, Some(node))
            .map(Some)
    }

    /// Bind the driver called `driver_name`, bypassing compatible matching
    pub fn bind_driver_to_node(
        &mut self,
        parent: DevId,
        driver_name: &str,
        name: &str,
        node: Option<NodeId>,
    ) -> Result<DevId> {
        let driver = self.catalog().find_driver_by_name(driver_name).ok_or_else(|| {
            error!("dm: cannot find driver '{}'", driver_name);
            ErrorKind::NoMatch
        })?;
        self.device_bind(Some(parent), driver, name, 0, node)
    }

    /// Bind every child node of `node` as a child device of `parent`
    pub fn scan_node_children(&mut self, parent: DevId, node: NodeId) -> Result<()> {
        let tree = self.tree().clone();
        let mut first = None;
        for &child in tree.children(node) {
            match self.bind_node(parent, child) {
                Ok(_) => {}
                Err(ErrorKind::OutOfMemory) => return Err(ErrorKind::OutOfMemory),
                Err(e) => {
                    warn!("dm: {} failed to bind: {}", tree.path(child), e);
                    first.get_or_insert(e);
                }
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Bind the child nodes of a device's own node below it
    pub fn scan_fdt_dev(&mut self, dev: DevId) -> Result<()> {
        match self.dev(dev)?.node() {
            Some(node) => self.scan_node_children(dev, node),
            None => Ok(()),
        }
    }

    /// Bind a set of subnodes to one caller-chosen driver
    ///
    /// Each subnode's `reg` gives its index among its siblings. The device
    /// takes the node's `label` as name, else `<parent>@<index>`. `on_bound`
    /// runs right after each bind, typically to store the index in the
    /// child's parent plat; a failure there unbinds that child again.
    /// Disabled subnodes are skipped.
    pub fn bind_subnodes(
        &mut self,
        parent: DevId,
        subnodes: impl IntoIterator<Item = Ofnode>,
        driver: &'static Driver,
        mut on_bound: impl FnMut(&mut Self, DevId, u32) -> Result<()>,
    ) -> SubnodeBinding {
        let mut result = SubnodeBinding::default();
        let parent_name = String::from(self.name(parent));

        for node in subnodes {
            if !node.is_enabled() {
                debug!("{}: skipping disabled {}", parent_name, node.path());
                continue;
            }
            let Some(index) = node.read_u32("reg") else {
                error!("{}: {} has no index", parent_name, node.path());
                result.errors.push((node.id(), ErrorKind::InvalidConfig));
                continue;
            };
            let name = match node.read_string("label") {
                Some(label) => String::from(label),
                None => format!("{}@{}", parent_name, index),
            };

            let dev = match self.device_bind(Some(parent), driver, &name, 0, Some(node.id())) {
                Ok(dev) => dev,
                Err(e) => {
                    result.errors.push((node.id(), e));
                    continue;
                }
            };
            if let Err(e) = on_bound(self, dev, index) {
                error!("{}: setting up '{}' failed: {}", parent_name, name, e);
                if let Err(e) = self.unbind(dev) {
                    warn!("{}: cannot unbind '{}': {}", parent_name, name, e);
                }
                result.errors.push((node.id(), e));
                continue;
            }
            result.bound.push(dev);
        }
        result
    }
}
