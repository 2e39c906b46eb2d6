mod common;

use common::*;
use device::{ClassId, DeviceState, DmFlags, ErrorKind, RemoveFlags};
use oreboot_fdt::TreeBuilder;

#[test]
fn probe_runs_hooks_in_order() {
    let mut dm = scanned(test_tree());
    let dev = by_name(&dm, "dev@1");

    dm.probe(dev).unwrap();
    assert_eq!(
        take_calls(),
        [
            "bus@0:state",
            "bus@0:probe",
            "dev@1:state",
            "dev@1:bus_uc_child_pre_probe",
            "dev@1:bus_child_pre_probe",
            "dev@1:uc_pre_probe",
            "dev@1:of_to_plat",
            "dev@1:probe",
            "dev@1:uc_post_probe",
            "dev@1:bus_uc_child_post_probe",
        ]
    );
    assert_eq!(dm.device_state(dev), Ok(DeviceState::Activated));
    assert!(dm.priv_::<TestPriv>(dev).unwrap().probed);
    assert!(dm.uclass_priv::<u32>(dev).is_some());
    assert!(dm.parent_priv::<u32>(dev).is_some());
}

#[test]
fn probing_an_active_device_does_nothing() {
    let mut dm = scanned(test_tree());
    let dev = by_name(&dm, "dev@2");

    dm.probe(dev).unwrap();
    take_calls();
    dm.probe(dev).unwrap();
    assert!(take_calls().is_empty());
}

#[test]
fn active_devices_have_active_parents() {
    let mut dm = scanned(test_tree());
    for name in ["dev@0", "dev@2"] {
        let dev = by_name(&dm, name);
        dm.probe(dev).unwrap();
    }

    let devices: Vec<_> = dm.devices().collect();
    for dev in devices {
        if dm.is_active(dev) {
            if let Some(parent) = dm.device(dev).unwrap().parent() {
                assert!(dm.is_active(parent), "{} active below inactive parent", dm.name(dev));
            }
        }
    }
    assert!(!dm.is_active(by_name(&dm, "dev@1")));
}

fn failing_tree(hook: &str) -> oreboot_fdt::Tree {
    TreeBuilder::new()
        .node("bus@0", |n| {
            n.compatible(&["test,bus"]).node("dev@0", |n| {
                n.compatible(&["test,dev"]).string("test,fail", hook);
            });
        })
        .build()
}

#[test]
fn failure_after_probe_calls_remove() {
    let mut dm = scanned(failing_tree("uc_post_probe"));
    let dev = by_name(&dm, "dev@0");

    assert_eq!(dm.probe(dev), Err(ErrorKind::HardwareTimeout));
    let calls = take_calls();
    assert_eq!(calls.last().map(String::as_str), Some("dev@0:remove"));
    assert_eq!(dm.device_state(dev), Ok(DeviceState::Bound));
    assert!(dm.priv_::<TestPriv>(dev).is_none());
    assert!(dm.uclass_priv::<u32>(dev).is_none());
    assert!(!dm.device(dev).unwrap().flags().contains(DmFlags::PLATDATA_VALID));

    // The parent probed on the device's behalf stays up
    assert!(dm.is_active(by_name(&dm, "bus@0")));
}

#[test]
fn failure_before_probe_skips_remove() {
    let mut dm = scanned(failing_tree("of_to_plat"));
    let dev = by_name(&dm, "dev@0");

    assert_eq!(dm.probe(dev), Err(ErrorKind::HardwareTimeout));
    let calls = take_calls();
    assert!(!calls.iter().any(|c| c == "dev@0:probe"));
    assert!(!calls.iter().any(|c| c == "dev@0:remove"));
    assert_eq!(dm.device_state(dev), Ok(DeviceState::Bound));
    assert!(dm.priv_::<TestPriv>(dev).is_none());

    // A later attempt starts from scratch
    assert_eq!(dm.probe(dev), Err(ErrorKind::HardwareTimeout));
    assert!(take_calls().iter().any(|c| c == "dev@0:of_to_plat"));
}

#[test]
fn probe_cycle_is_detected() {
    let tree = TreeBuilder::new()
        .node("a", |n| {
            n.compatible(&["test,peer"]).phandle(1).u32("test,peer", 2);
        })
        .node("b", |n| {
            n.compatible(&["test,peer"]).phandle(2).u32("test,peer", 1);
        })
        .build();
    let mut dm = scanned(tree);
    let a = by_name(&dm, "a");
    let b = by_name(&dm, "b");

    assert_eq!(dm.probe(a), Err(ErrorKind::CircularDependency));
    assert_eq!(take_calls(), ["a:state", "a:probe", "b:state", "b:probe"]);
    assert_eq!(dm.device_state(a), Ok(DeviceState::Bound));
    assert_eq!(dm.device_state(b), Ok(DeviceState::Bound));
}

#[test]
fn remove_refuses_active_children() {
    let mut dm = scanned(test_tree());
    let bus = by_name(&dm, "bus@0");
    let dev = by_name(&dm, "dev@0");
    dm.probe(dev).unwrap();
    take_calls();

    assert_eq!(dm.remove(bus), Err(ErrorKind::HasActiveChildren));
    assert!(dm.is_active(bus));

    dm.remove(dev).unwrap();
    assert_eq!(
        take_calls(),
        ["dev@0:uc_pre_remove", "dev@0:remove", "dev@0:bus_child_post_remove"]
    );
    assert_eq!(dm.device_state(dev), Ok(DeviceState::Bound));
    assert!(dm.priv_::<TestPriv>(dev).is_none());
    dm.remove(bus).unwrap();
}

#[test]
fn refused_remove_restores_device() {
    let mut dm = scanned(failing_tree("remove"));
    let dev = by_name(&dm, "dev@0");
    dm.probe(dev).unwrap();
    take_calls();

    assert_eq!(dm.remove(dev), Err(ErrorKind::HardwareTimeout));
    assert_eq!(
        take_calls(),
        ["dev@0:uc_pre_remove", "dev@0:remove", "dev@0:uc_post_probe"]
    );
    assert_eq!(dm.device_state(dev), Ok(DeviceState::Activated));
    assert!(dm.priv_::<TestPriv>(dev).is_some());
}

#[test]
fn remove_subtree_keeps_vital_devices() {
    let tree = TreeBuilder::new()
        .node("bus@0", |n| {
            n.compatible(&["test,bus"])
                .node("dev@0", |n| {
                    n.compatible(&["test,dev"]);
                })
                .node("vital@1", |n| {
                    n.compatible(&["test,vital"]);
                });
        })
        .build();
    let mut dm = scanned(tree);
    let bus = by_name(&dm, "bus@0");
    let dev = by_name(&dm, "dev@0");
    let vital = by_name(&dm, "vital@1");
    dm.probe(dev).unwrap();
    dm.probe(vital).unwrap();

    dm.remove_subtree(bus, RemoveFlags::NORMAL | RemoveFlags::NON_VITAL)
        .unwrap();
    assert!(!dm.is_active(dev));
    assert!(dm.is_active(vital));
    assert!(dm.is_active(bus));

    dm.remove_subtree(bus, RemoveFlags::NORMAL).unwrap();
    assert!(!dm.is_active(vital));
    assert!(!dm.is_active(bus));
}

#[test]
fn unbind_cascades_to_children() {
    let mut dm = scanned(test_tree());
    let bus = by_name(&dm, "bus@0");
    let dev0 = by_name(&dm, "dev@0");
    let dev1 = by_name(&dm, "dev@1");

    dm.unbind(bus).unwrap();
    assert_eq!(
        take_calls(),
        [
            "dev@0:unbind",
            "dev@0:uc_pre_unbind",
            "dev@1:unbind",
            "dev@1:uc_pre_unbind",
        ]
    );
    for dev in [bus, dev0, dev1] {
        assert!(dm.device(dev).is_none());
    }
    assert_eq!(dm.uclass_devices(ClassId::Test).len(), 1);
    assert!(dm.uclass_devices(ClassId::TestBus).is_empty());
}

#[test]
fn unbind_refuses_active_devices() {
    let mut dm = scanned(test_tree());
    let dev = by_name(&dm, "dev@2");
    dm.probe(dev).unwrap();

    assert_eq!(dm.unbind(dev), Err(ErrorKind::InvalidState));
    dm.remove(dev).unwrap();
    dm.unbind(dev).unwrap();
}

#[test]
fn uninit_tears_everything_down() {
    let mut dm = scanned(test_tree());
    let dev = by_name(&dm, "dev@1");
    dm.probe(dev).unwrap();
    take_calls();

    dm.uninit().unwrap();
    let calls = take_calls();
    assert!(calls.iter().any(|c| c == "dev@1:remove"));
    assert!(calls.iter().any(|c| c == "dev@2:unbind"));
    assert_eq!(dm.devices().count(), 0);
    assert!(dm.roots().is_empty());
    assert!(dm.root().is_none());
    assert!(dm.class(ClassId::Test).is_none());
}
