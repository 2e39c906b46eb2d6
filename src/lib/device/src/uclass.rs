//! Finding devices by uclass, sequence number, name and node
//!
//! `find` variants only look; `get` variants also probe what they find.

use oreboot_fdt::NodeId;

use crate::{ClassId, DevId, DeviceState, DriverModel, ErrorKind, Result};

impl DriverModel {
    /// Devices of a uclass, in bind order
    pub fn uclass_devices(&self, id: ClassId) -> &[DevId] {
        self.class(id).map(|c| c.devices()).unwrap_or(&[])
    }

    pub fn uclass_find_device(&self, id: ClassId, index: usize) -> Result<DevId> {
        self.uclass_devices(id)
            .get(index)
            .copied()
            .ok_or(ErrorKind::NotFound)
    }

    pub fn uclass_get_device(&mut self, id: ClassId, index: usize) -> Result<DevId> {
        let dev = self.uclass_find_device(id, index)?;
        self.probe(dev)?;
        Ok(dev)
    }

    pub fn uclass_find_device_by_seq(&self, id: ClassId, seq: u32) -> Result<DevId> {
        self.uclass_devices(id)
            .iter()
            .copied()
            .find(|d| self.device(*d).is_some_and(|dev| dev.seq() == seq))
            .ok_or(ErrorKind::NotFound)
    }

    pub fn uclass_get_device_by_seq(&mut self, id: ClassId, seq: u32) -> Result<DevId> {
        let dev = self.uclass_find_device_by_seq(id, seq)?;
        self.probe(dev)?;
        Ok(dev)
    }

    pub fn uclass_find_device_by_name(&self, id: ClassId, name: &str) -> Result<DevId> {
        self.uclass_devices(id)
            .iter()
            .copied()
            .find(|d| self.name(*d) == name)
            .ok_or(ErrorKind::NotFound)
    }

    pub fn uclass_get_device_by_name(&mut self, id: ClassId, name: &str) -> Result<DevId> {
        let dev = self.uclass_find_device_by_name(id, name)?;
        self.probe(dev)?;
        Ok(dev)
    }

    pub fn uclass_find_device_by_ofnode(&self, id: ClassId, node: NodeId) -> Result<DevId> {
        self.uclass_devices(id)
            .iter()
            .copied()
            .find(|d| self.device(*d).is_some_and(|dev| dev.node() == Some(node)))
            .ok_or(ErrorKind::NotFound)
    }

    pub fn uclass_get_device_by_ofnode(&mut self, id: ClassId, node: NodeId) -> Result<DevId> {
        let dev = self.uclass_find_device_by_ofnode(id, node)?;
        self.probe(dev)?;
        Ok(dev)
    }

    /// Device of `id` that the phandle property `name` of `dev`'s node points to
    pub fn uclass_get_device_by_phandle(
        &mut self,
        id: ClassId,
        dev: DevId,
        name: &str,
    ) -> Result<DevId> {
        let target = self
            .ofnode(dev)
            .and_then(|node| node.read_phandle(name))
            .ok_or(ErrorKind::NotFound)?;
        self.uclass_get_device_by_ofnode(id, target.id())
    }

    /// Device bound to `node`, in any uclass
    pub fn find_device_by_node(&self, node: NodeId) -> Option<DevId> {
        self.devices()
            .find(|d| self.device(*d).is_some_and(|dev| dev.node() == Some(node)))
    }

    pub fn first_child(&self, dev: DevId) -> Option<DevId> {
        self.device(dev)?.children().first().copied()
    }

    pub fn next_sibling(&self, dev: DevId) -> Option<DevId> {
        let parent = self.device(dev)?.parent()?;
        let siblings = self.device(parent)?.children();
        let pos = siblings.iter().position(|c| *c == dev)?;
        siblings.get(pos + 1).copied()
    }

    /// Nearest ancestor of `dev` (excluding itself) in uclass `id`
    pub fn ancestor_in_class(&self, dev: DevId, id: ClassId) -> Option<DevId> {
        let mut cur = self.device(dev)?.parent();
        while let Some(p) = cur {
            let device = self.device(p)?;
            if device.class_id() == id {
                return Some(p);
            }
            cur = device.parent();
        }
        None
    }

    pub fn device_state(&self, dev: DevId) -> Result<DeviceState> {
        Ok(self.dev(dev)?.state())
    }

    pub fn is_active(&self, dev: DevId) -> bool {
        self.device(dev).is_some_and(|d| d.is_active())
    }
}
