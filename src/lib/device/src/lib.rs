//! The oreboot driver model
//!
//! Drivers are grouped into uclasses by the interface they provide. At boot a
//! [`DriverModel`] walks the hardware description, binds a driver to every
//! node some driver claims and later probes devices on demand, parents
//! first. Consumers reach a device's capabilities through its uclass
//! operations table, see [`ClassOps`] and [`invoke!`].
#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod bind;
pub mod catalog;
mod class;
mod class_id;
mod device;
mod error;
mod lifecycle;
mod model;
mod ops;
pub mod root;
mod timer;
mod uclass;

pub use self::{
    bind::SubnodeBinding,
    catalog::{Catalog, CatalogBuilder},
    class::{Class, ClassDriver, ClassFlags, ClassHook},
    class_id::ClassId,
    device::{auto, Alloc, DevId, Device, DeviceId, DeviceState, DmFlags, Driver, Hook, RemoveFlags},
    error::{ErrorKind, Result},
    model::DriverModel,
    ops::{ClassOps, Ops},
    root::SimpleBusPlat,
    timer::{Delay, SpinDelay},
};
