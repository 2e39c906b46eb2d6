#![allow(dead_code)]

use device::{DevId, DriverModel};
use oreboot_fdt::Tree;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A model over `tree` with every enabled driver, scanned
pub fn scanned(tree: Tree) -> DriverModel {
    init_logger();
    let mut dm = DriverModel::new(drivers::catalog().unwrap(), tree);
    dm.init_and_scan().unwrap();
    dm
}

/// Same as [`scanned`], reporting the scan result instead of asserting it
pub fn try_scanned(tree: Tree) -> (DriverModel, device::Result<()>) {
    init_logger();
    let mut dm = DriverModel::new(drivers::catalog().unwrap(), tree);
    let result = dm.init_and_scan();
    (dm, result)
}

pub fn by_name(dm: &DriverModel, name: &str) -> DevId {
    dm.devices()
        .find(|d| dm.name(*d) == name)
        .unwrap_or_else(|| panic!("no device {}", name))
}
