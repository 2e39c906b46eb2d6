mod common;

use std::{cell::Cell, rc::Rc};

use common::*;
use device::{ClassId, DeviceState, ErrorKind};
use drivers::regulator::{
    self,
    sandbox::{calls, clear_calls, RegulatorCall},
    AutosetStatus, RegulatorType,
};
use oreboot_fdt::{NodeBuilder, TreeBuilder};

fn ldo(n: &mut NodeBuilder, name: &str) {
    n.compatible(&["sandbox,regulator"])
        .string("regulator-name", name);
}

#[test]
fn pinned_always_on_regulator_is_set_then_enabled_once() {
    let mut dm = scanned(
        TreeBuilder::new()
            .node("ldo1", |n| {
                ldo(n, "VDD_3V3");
                n.u32("regulator-min-microvolt", 3_300_000)
                    .u32("regulator-max-microvolt", 3_300_000)
                    .flag("regulator-always-on");
            })
            .build(),
    );
    let dev = by_name(&dm, "ldo1");

    // Always-on regulators are probed, and so autoset, by the scan
    assert_eq!(dm.device_state(dev), Ok(DeviceState::Activated));
    assert_eq!(
        calls(&dm, dev),
        [RegulatorCall::SetValue(3_300_000), RegulatorCall::SetEnable(true)]
    );

    clear_calls(&mut dm, dev);
    assert_eq!(regulator::autoset(&mut dm, dev), Ok(AutosetStatus::AlreadyDone));
    assert!(calls(&dm, dev).is_empty());
    assert_eq!(regulator::get_value(&mut dm, dev), Ok(3_300_000));
    assert_eq!(regulator::get_enable(&mut dm, dev), Ok(true));
}

#[test]
fn force_off_wins_over_always_on() {
    let dm = scanned(
        TreeBuilder::new()
            .node("ldo2", |n| {
                ldo(n, "VDD_OFF");
                n.u32("regulator-min-microvolt", 1_800_000)
                    .u32("regulator-max-microvolt", 1_800_000)
                    .flag("regulator-always-on")
                    .flag("regulator-force-boot-off");
            })
            .build(),
    );
    let dev = by_name(&dm, "ldo2");

    assert_eq!(calls(&dm, dev), [RegulatorCall::SetEnable(false)]);
}

#[test]
fn unconstrained_regulator_has_nothing_to_do() {
    let mut dm = scanned(
        TreeBuilder::new()
            .node("ldo3", |n| ldo(n, "SPARE"))
            .build(),
    );
    let dev = by_name(&dm, "ldo3");
    assert_eq!(dm.device_state(dev), Ok(DeviceState::Bound));

    // Probing autosets; the explicit call then finds it done
    dm.probe(dev).unwrap();
    assert!(calls(&dm, dev).is_empty());
    assert_eq!(regulator::autoset(&mut dm, dev), Ok(AutosetStatus::AlreadyDone));
}

#[test]
fn suspend_state_is_applied_before_boot_state() {
    let dm = scanned(
        TreeBuilder::new()
            .node("buck1", |n| {
                n.compatible(&["sandbox,regulator-suspend"])
                    .string("regulator-name", "VDD_CPU")
                    .u32("regulator-min-microvolt", 900_000)
                    .u32("regulator-max-microvolt", 1_100_000)
                    .u32("regulator-init-microvolt", 1_000_000)
                    .flag("regulator-boot-on")
                    .node("regulator-state-mem", |n| {
                        n.u32("regulator-suspend-microvolt", 950_000);
                    });
            })
            .build(),
    );
    let dev = by_name(&dm, "buck1");

    assert_eq!(
        calls(&dm, dev),
        [
            RegulatorCall::SetSuspendEnable(true),
            RegulatorCall::SetSuspendValue(950_000),
            RegulatorCall::SetValue(1_000_000),
            RegulatorCall::SetEnable(true),
        ]
    );
}

#[test]
fn off_in_suspend_skips_the_suspend_voltage() {
    let dm = scanned(
        TreeBuilder::new()
            .node("buck2", |n| {
                n.compatible(&["sandbox,regulator-suspend"])
                    .string("regulator-name", "VDD_GPU")
                    .u32("regulator-max-microvolt", 1_200_000)
                    .flag("regulator-boot-on")
                    .node("regulator-state-mem", |n| {
                        n.flag("regulator-off-in-suspend");
                    });
            })
            .build(),
    );
    let dev = by_name(&dm, "buck2");

    assert_eq!(
        calls(&dm, dev),
        [RegulatorCall::SetSuspendEnable(false), RegulatorCall::SetEnable(true)]
    );
}

#[test]
fn enabling_waits_for_the_ramp() {
    init_logger();
    let tree = TreeBuilder::new()
        .node("ldo4", |n| {
            ldo(n, "VDD_RAMP");
            n.u32("regulator-min-microvolt", 1_200_000)
                .u32("regulator-max-microvolt", 3_300_000)
                .u32("regulator-init-microvolt", 1_800_000)
                .u32("regulator-ramp-delay", 12_500)
                .flag("regulator-boot-on");
        })
        .build();
    let waited = Rc::new(Cell::new(0));
    let mut dm = device::DriverModel::new(drivers::catalog().unwrap(), tree);
    let sink = waited.clone();
    dm.set_delay(Box::new(move |us: u32| sink.set(sink.get() + us)));
    dm.init_and_scan().unwrap();
    let dev = by_name(&dm, "ldo4");

    // Off while the voltage was set, so only switching on ramps 0 -> 1.8 V
    assert_eq!(waited.get(), 144);

    waited.set(0);
    regulator::set_value(&mut dm, dev, 3_300_000).unwrap();
    assert_eq!(waited.get(), 120);

    // Partial steps round up
    waited.set(0);
    regulator::set_value(&mut dm, dev, 3_299_999).unwrap();
    assert_eq!(waited.get(), 1);

    waited.set(0);
    regulator::set_value(&mut dm, dev, 2_000_000).unwrap();
    assert_eq!(waited.get(), 104);
}

#[test]
fn failed_voltage_still_enables() {
    let (mut dm, result) = try_scanned(
        TreeBuilder::new()
            .node("ldo9", |n| {
                ldo(n, "VDD_STUCK");
                n.u32("regulator-min-microvolt", 2_500_000)
                    .u32("regulator-max-microvolt", 2_500_000)
                    .flag("regulator-boot-on")
                    .flag("sandbox,fail-set-value");
            })
            .build(),
    );
    let dev = by_name(&dm, "ldo9");

    assert_eq!(result, Err(ErrorKind::HardwareTimeout));
    assert_eq!(dm.device_state(dev), Ok(DeviceState::Bound));
    assert_eq!(calls(&dm, dev), [RegulatorCall::SetEnable(true)]);

    // Autoset is not retried, so the next probe goes through
    clear_calls(&mut dm, dev);
    dm.probe(dev).unwrap();
    assert!(calls(&dm, dev).is_empty());
    assert_eq!(regulator::autoset(&mut dm, dev), Ok(AutosetStatus::AlreadyDone));
}

#[test]
fn set_value_checks_the_range() {
    let mut dm = scanned(
        TreeBuilder::new()
            .node("ldo5", |n| {
                ldo(n, "VDD_IO");
                n.u32("regulator-min-microvolt", 1_800_000)
                    .u32("regulator-max-microvolt", 3_300_000);
            })
            .build(),
    );
    let dev = regulator::get_by_platname(&mut dm, "VDD_IO").unwrap();

    assert_eq!(
        regulator::set_value(&mut dm, dev, 5_000_000),
        Err(ErrorKind::InvalidArgument)
    );
    assert!(calls(&dm, dev).is_empty());
    regulator::set_value_force(&mut dm, dev, 5_000_000).unwrap();
    assert_eq!(calls(&dm, dev), [RegulatorCall::SetValue(5_000_000)]);
}

#[test]
fn always_on_refuses_to_switch_off() {
    let mut dm = scanned(
        TreeBuilder::new()
            .node("ldo6", |n| {
                ldo(n, "VDD_CORE");
                n.flag("regulator-always-on");
            })
            .build(),
    );
    let dev = by_name(&dm, "ldo6");
    clear_calls(&mut dm, dev);

    assert_eq!(
        regulator::set_enable(&mut dm, dev, false),
        Err(ErrorKind::PermissionDenied)
    );
    assert_eq!(regulator::set_enable_if_allowed(&mut dm, dev, false), Ok(()));
    assert!(calls(&dm, dev).is_empty());
}

#[test]
fn regulator_names_are_unique() {
    let (dm, result) = try_scanned(
        TreeBuilder::new()
            .node("ldo7", |n| ldo(n, "VDD"))
            .node("ldo8", |n| ldo(n, "VDD"))
            .build(),
    );

    assert_eq!(result, Err(ErrorKind::DuplicateIdentity));
    assert_eq!(dm.uclass_devices(ClassId::Regulator).len(), 1);
}

#[test]
fn inverted_range_fails_probe() {
    let mut dm = scanned(
        TreeBuilder::new()
            .node("ldo9", |n| {
                ldo(n, "BROKEN");
                n.u32("regulator-min-microvolt", 3_300_000)
                    .u32("regulator-max-microvolt", 1_800_000);
            })
            .build(),
    );
    let dev = by_name(&dm, "ldo9");

    assert_eq!(dm.probe(dev), Err(ErrorKind::InvalidConfig));
    assert_eq!(dm.device_state(dev), Ok(DeviceState::Bound));
}

#[test]
fn oversized_voltage_is_rejected() {
    let mut dm = scanned(
        TreeBuilder::new()
            .node("ldo9", |n| {
                ldo(n, "HUGE");
                n.u32("regulator-min-microvolt", 1_800_000)
                    .u32("regulator-max-microvolt", 0x8000_0000);
            })
            .build(),
    );
    let dev = by_name(&dm, "ldo9");

    assert_eq!(dm.probe(dev), Err(ErrorKind::InvalidConfig));
    assert_eq!(regulator::plat(&dm, dev).unwrap().max_uv, None);
}

#[test]
fn supply_lookup_follows_the_phandle() {
    let mut dm = scanned(
        TreeBuilder::new()
            .node("ldo10", |n| {
                ldo(n, "VCC_SD");
                n.phandle(7);
            })
            .node("ldo11", |n| {
                ldo(n, "VQMMC");
                n.u32("vin-supply", 7);
            })
            .build(),
    );
    let consumer = by_name(&dm, "ldo11");

    let supply = regulator::device_get_supply_regulator(&mut dm, consumer, "vin-supply").unwrap();
    assert_eq!(supply, by_name(&dm, "ldo10"));
    assert!(dm.is_active(supply));
    assert_eq!(regulator::get_by_devname(&mut dm, "ldo10"), Ok(supply));
    assert_eq!(
        regulator::get_by_platname(&mut dm, "NOPE"),
        Err(ErrorKind::NotFound)
    );
}

#[test]
fn fixed_regulator_reports_its_pinned_voltage() {
    let mut dm = scanned(
        TreeBuilder::new()
            .node("vcc5v", |n| {
                n.compatible(&["regulator-fixed"])
                    .string("regulator-name", "VCC5V")
                    .u32("regulator-min-microvolt", 5_000_000)
                    .u32("regulator-max-microvolt", 5_000_000)
                    .u32("startup-delay-us", 50)
                    .flag("regulator-boot-on");
            })
            .build(),
    );
    let dev = by_name(&dm, "vcc5v");

    assert_eq!(regulator::plat(&dm, dev).unwrap().type_, RegulatorType::Fixed);
    assert_eq!(regulator::get_value(&mut dm, dev), Ok(5_000_000));
    assert_eq!(regulator::get_enable(&mut dm, dev), Ok(true));
    assert_eq!(
        regulator::set_value(&mut dm, dev, 5_000_000),
        Err(ErrorKind::NotImplemented)
    );
    regulator::set_enable(&mut dm, dev, false).unwrap();
    assert_eq!(regulator::get_enable(&mut dm, dev), Ok(false));
}

#[test]
fn boot_off_switches_forced_regulators_off() {
    let mut dm = scanned(
        TreeBuilder::new()
            .node("ldo12", |n| {
                ldo(n, "VDD_LATE");
                n.flag("regulator-force-boot-off");
            })
            .build(),
    );
    let dev = by_name(&dm, "ldo12");

    regulator::enable_boot_on(&mut dm).unwrap();
    assert_eq!(calls(&dm, dev), [RegulatorCall::SetEnable(false)]);
    regulator::enable_boot_off(&mut dm).unwrap();
    assert_eq!(
        calls(&dm, dev),
        [RegulatorCall::SetEnable(false), RegulatorCall::SetEnable(false)]
    );
}
