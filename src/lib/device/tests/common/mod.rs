#![allow(dead_code)]

use std::cell::RefCell;

use device::{
    auto, invoke, Catalog, ClassDriver, ClassFlags, ClassId, ClassOps, DevId, DeviceId, DmFlags,
    Driver, DriverModel, ErrorKind, Ops, Result,
};
use oreboot_fdt::{NodeBuilder, Tree, TreeBuilder};

thread_local! {
    static CALLS: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn record(dm: &DriverModel, dev: DevId, hook: &str) {
    let entry = format!("{}:{}", dm.name(dev), hook);
    CALLS.with(|c| c.borrow_mut().push(entry));
}

/// Hook calls recorded since the last call, oldest first
pub fn take_calls() -> Vec<String> {
    CALLS.with(|c| c.borrow_mut().drain(..).collect())
}

/// Record `hook` and fail it when the device's node says `test,fail = hook`
fn step(dm: &mut DriverModel, dev: DevId, hook: &str) -> Result<()> {
    record(dm, dev, hook);
    let fail = dm
        .ofnode(dev)
        .is_some_and(|n| n.read_string("test,fail") == Some(hook));
    if fail {
        Err(ErrorKind::HardwareTimeout)
    } else {
        Ok(())
    }
}

macro_rules! recording_hooks {
    ($($name:ident => $label:literal,)*) => {
        $(
            fn $name(dm: &mut DriverModel, dev: DevId) -> Result<()> {
                step(dm, dev, $label)
            }
        )*
    };
}

recording_hooks! {
    uc_post_bind => "uc_post_bind",
    uc_pre_probe => "uc_pre_probe",
    uc_post_probe => "uc_post_probe",
    uc_pre_remove => "uc_pre_remove",
    uc_pre_unbind => "uc_pre_unbind",
    drv_of_to_plat => "of_to_plat",
    drv_remove => "remove",
    drv_unbind => "unbind",
    bus_probe => "probe",
    bus_uc_child_post_bind => "bus_uc_child_post_bind",
    bus_uc_child_pre_probe => "bus_uc_child_pre_probe",
    bus_uc_child_post_probe => "bus_uc_child_post_probe",
    bus_child_post_bind => "bus_child_post_bind",
    bus_child_pre_probe => "bus_child_pre_probe",
    bus_child_post_remove => "bus_child_post_remove",
    state_hook => "state",
}

#[derive(Debug, Default)]
pub struct TestPriv {
    pub probed: bool,
}

fn drv_bind(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    step(dm, dev, "bind")?;
    if dm.ofnode(dev).is_some_and(|n| n.read_bool("test,probe-after-bind")) {
        dm.set_probe_after_bind(dev)?;
    }
    Ok(())
}

fn drv_probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    step(dm, dev, "probe")?;
    let p = dm.priv_mut::<TestPriv>(dev).ok_or(ErrorKind::InvalidState)?;
    p.probed = true;
    Ok(())
}

fn bus_post_bind(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    dm.scan_fdt_dev(dev)
}

fn peer_probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    record(dm, dev, "probe");
    dm.uclass_get_device_by_phandle(ClassId::TestProbe, dev, "test,peer")?;
    Ok(())
}

pub struct TestOps {
    pub ping: Option<fn(&mut DriverModel, DevId, u32) -> Result<u32>>,
    pub reset: Option<fn(&mut DriverModel, DevId) -> Result<()>>,
}

impl ClassOps for TestOps {
    const CLASS: ClassId = ClassId::Test;
}

/// Operations table of another uclass
pub struct ProbeOps {
    pub kick: Option<fn(&mut DriverModel, DevId) -> Result<()>>,
}

impl ClassOps for ProbeOps {
    const CLASS: ClassId = ClassId::TestProbe;
}

fn ping(dm: &mut DriverModel, dev: DevId, value: u32) -> Result<u32> {
    Ok(value + dm.device(dev).map_or(0, |d| d.seq()))
}

static TEST_OPS: TestOps = TestOps {
    ping: Some(ping),
    reset: None,
};

static TEST_CLASS: ClassDriver = ClassDriver {
    name: "test",
    id: ClassId::Test,
    post_bind: Some(uc_post_bind),
    pre_probe: Some(uc_pre_probe),
    post_probe: Some(uc_post_probe),
    pre_remove: Some(uc_pre_remove),
    pre_unbind: Some(uc_pre_unbind),
    per_device_auto: Some(auto::<u32>),
    flags: ClassFlags::SEQ_ALIAS,
    ..ClassDriver::new()
};

static TEST_BUS_CLASS: ClassDriver = ClassDriver {
    name: "test_bus",
    id: ClassId::TestBus,
    post_bind: Some(bus_post_bind),
    child_post_bind: Some(bus_uc_child_post_bind),
    child_pre_probe: Some(bus_uc_child_pre_probe),
    child_post_probe: Some(bus_uc_child_post_probe),
    per_child_auto: Some(auto::<u32>),
    ..ClassDriver::new()
};

static TEST_PROBE_CLASS: ClassDriver = ClassDriver {
    name: "test_probe",
    id: ClassId::TestProbe,
    ..ClassDriver::new()
};

pub static TEST_DRIVER: Driver = Driver {
    name: "test_drv",
    id: ClassId::Test,
    of_match: &[DeviceId::new("test,dev"), DeviceId::with_data("test,dev-v2", 2)],
    bind: Some(drv_bind),
    of_to_plat: Some(drv_of_to_plat),
    probe: Some(drv_probe),
    remove: Some(drv_remove),
    unbind: Some(drv_unbind),
    priv_auto: Some(auto::<TestPriv>),
    ops: Ops::new(&TEST_OPS),
    ..Driver::new()
};

pub static TEST_BARE_DRIVER: Driver = Driver {
    name: "test_bare",
    id: ClassId::Test,
    of_match: &[DeviceId::new("test,bare")],
    ..Driver::new()
};

pub static TEST_VITAL_DRIVER: Driver = Driver {
    name: "test_vital",
    id: ClassId::Test,
    of_match: &[DeviceId::new("test,vital")],
    remove: Some(drv_remove),
    flags: DmFlags::VITAL,
    ..Driver::new()
};

static TEST_BUS_DRIVER: Driver = Driver {
    name: "test_bus",
    id: ClassId::TestBus,
    of_match: &[DeviceId::new("test,bus")],
    probe: Some(bus_probe),
    child_post_bind: Some(bus_child_post_bind),
    child_pre_probe: Some(bus_child_pre_probe),
    child_post_remove: Some(bus_child_post_remove),
    ..Driver::new()
};

static TEST_PEER_DRIVER: Driver = Driver {
    name: "test_peer",
    id: ClassId::TestProbe,
    of_match: &[DeviceId::new("test,peer")],
    probe: Some(peer_probe),
    ..Driver::new()
};

pub fn catalog() -> &'static Catalog {
    device::catalog::install(|| {
        Catalog::builder()
            .class(&TEST_CLASS)
            .class(&TEST_BUS_CLASS)
            .class(&TEST_PROBE_CLASS)
            .drivers(&[
                &TEST_DRIVER,
                &TEST_BARE_DRIVER,
                &TEST_VITAL_DRIVER,
                &TEST_BUS_DRIVER,
                &TEST_PEER_DRIVER,
            ])
            .state_hook(state_hook)
            .build()
    })
    .unwrap()
}

fn dev_node(n: &mut NodeBuilder, reg: u32) {
    n.compatible(&["test,dev"]).u32("reg", reg);
}

/// A bus with two devices, a top-level device and a few nodes that bind
/// nothing
pub fn test_tree() -> Tree {
    TreeBuilder::new()
        .node("aliases", |n| {
            n.string("test1", "/bus@0/dev@0");
        })
        .node("bus@0", |n| {
            n.compatible(&["test,bus"])
                .node("dev@0", |n| dev_node(n, 0))
                .node("dev@1", |n| dev_node(n, 1));
        })
        .node("dev@2", |n| dev_node(n, 2))
        .node("nomatch", |n| {
            n.compatible(&["vendor,none"]);
        })
        .node("off", |n| {
            n.compatible(&["test,dev"]).disabled();
        })
        .build()
}

/// A model over `tree` with the root bound and the tree scanned
pub fn scanned(tree: Tree) -> DriverModel {
    init_logger();
    let mut dm = DriverModel::new(catalog(), tree);
    dm.init_and_scan().unwrap();
    take_calls();
    dm
}

pub fn by_name(dm: &DriverModel, name: &str) -> DevId {
    dm.devices()
        .find(|d| dm.name(*d) == name)
        .unwrap_or_else(|| panic!("no device {}", name))
}

pub fn ping_dev(dm: &mut DriverModel, dev: DevId, value: u32) -> Result<u32> {
    invoke!(dm, dev, TestOps, ping, value)
}
