//! Built-in drivers: the root of the device tree and simple buses

use log::warn;

use crate::{
    auto, ClassDriver, ClassId, DevId, DeviceId, Driver, DriverModel, ErrorKind, Result,
};

pub static ROOT_CLASS: ClassDriver = ClassDriver {
    name: "root",
    id: ClassId::Root,
    ..ClassDriver::new()
};

/// Driver of the single root device every other device hangs below
pub static ROOT_DRIVER: Driver = Driver {
    name: "root_driver",
    id: ClassId::Root,
    ..Driver::new()
};

/// Address window a simple bus maps for its children
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SimpleBusPlat {
    pub base: u32,
    pub size: u32,
    pub target: u32,
}

impl SimpleBusPlat {
    /// Translate a child bus address into the parent's address space
    ///
    /// Addresses outside the window, and those that would land past the top
    /// of the parent's space, are passed through unchanged.
    pub fn translate(&self, addr: u32) -> u32 {
        if self.size != 0 && addr >= self.base && addr - self.base < self.size {
            (addr - self.base).checked_add(self.target).unwrap_or(addr)
        } else {
            addr
        }
    }
}

fn simple_bus_post_bind(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let ranges = dm
        .ofnode(dev)
        .and_then(|node| node.read_u32_array("ranges"))
        .unwrap_or_default();
    if let &[base, target, size, ..] = ranges.as_slice() {
        if let Some(plat) = dm.uclass_plat_mut::<SimpleBusPlat>(dev) {
            *plat = SimpleBusPlat { base, size, target };
        }
    }

    // A child that fails to bind does not take the bus down with it
    match dm.scan_fdt_dev(dev) {
        Err(ErrorKind::OutOfMemory) => Err(ErrorKind::OutOfMemory),
        Err(e) => {
            warn!("{}: some children failed to bind: {}", dm.name(dev), e);
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

pub static SIMPLE_BUS_CLASS: ClassDriver = ClassDriver {
    name: "simple_bus",
    id: ClassId::SimpleBus,
    post_bind: Some(simple_bus_post_bind),
    per_device_plat_auto: Some(auto::<SimpleBusPlat>),
    ..ClassDriver::new()
};

pub static SIMPLE_BUS_DRIVER: Driver = Driver {
    name: "simple_bus",
    id: ClassId::SimpleBus,
    of_match: &[DeviceId::new("simple-bus"), DeviceId::new("simple-mfd")],
    ..Driver::new()
};

#[cfg(test)]
mod tests {
    use super::SimpleBusPlat;

    #[test]
    fn translate_maps_the_window_only() {
        let bus = SimpleBusPlat { base: 0x1000, size: 0x100, target: 0x8000_0000 };
        assert_eq!(bus.translate(0x1010), 0x8000_0010);
        assert_eq!(bus.translate(0x1100), 0x1100);
        assert_eq!(bus.translate(0x0fff), 0x0fff);
    }

    #[test]
    fn translate_past_the_top_passes_through() {
        let bus = SimpleBusPlat { base: 0, size: 0x1000, target: 0xffff_f800 };
        assert_eq!(bus.translate(0x7ff), 0xffff_ffff);
        assert_eq!(bus.translate(0x800), 0x800);
    }
}
