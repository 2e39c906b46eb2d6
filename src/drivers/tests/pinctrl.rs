mod common;

use common::*;
use device::{ClassId, DevId, DriverModel, ErrorKind};
use drivers::pinctrl::{
    self, generic,
    sandbox::{calls, clear_calls, PinctrlCall},
    PinConfigParam,
};
use oreboot_fdt::{Tree, TreeBuilder};

const BIAS_PULL_UP: u32 = PinConfigParam::BiasPullUp as u32;
const BIAS_DISABLE: u32 = PinConfigParam::BiasDisable as u32;
const DRIVE_STRENGTH: u32 = PinConfigParam::DriveStrength as u32;
const INPUT_ENABLE: u32 = PinConfigParam::InputEnable as u32;

fn pinctrl_tree() -> Tree {
    TreeBuilder::new()
        .node("pinctrl", |n| {
            n.compatible(&["sandbox,pinctrl"])
                .node("uart_default", |n| {
                    n.phandle(1)
                        .strings("groups", &["uart_default"])
                        .string("function", "uart");
                })
                .node("uart_sleep", |n| {
                    n.phandle(2)
                        .strings("groups", &["uart_sleep"])
                        .string("function", "gpio");
                })
                .node("i2c", |n| {
                    n.phandle(3)
                        .strings("pins", &["SCL", "SDA"])
                        .string("function", "i2c")
                        .flag("bias-pull-up")
                        .u32("drive-strength", 8);
                })
                .node("w1", |n| {
                    n.phandle(4).u32s("pinmux", &[4, 4]).flag("bias-pull-up");
                })
                .node("nested", |n| {
                    n.phandle(5)
                        .node("spi", |n| {
                            n.strings("groups", &["spi"]).string("function", "spi");
                        })
                        .node("gpio", |n| {
                            n.strings("pins", &["GPIO0"]).flag("bias-disable");
                        });
                })
                .node("bad_pin", |n| {
                    n.phandle(6)
                        .strings("pins", &["NOPE"])
                        .string("function", "gpio");
                })
                .node("gpio-bank", |n| {
                    n.compatible(&["sandbox,gpio"]).flag("gpio-controller");
                });
        })
        .node("pinctrl-nomux", |n| {
            n.compatible(&["sandbox,pinctrl-nomux"])
                .node("input", |n| {
                    n.phandle(10)
                        .strings("pins", &["A"])
                        .flag("input-enable");
                })
                .node("mux", |n| {
                    n.phandle(11)
                        .strings("groups", &["i2c"])
                        .string("function", "i2c")
                        .flag("bias-pull-up")
                        .node("mux_pin", |n| {
                            n.strings("pins", &["A"]).flag("input-enable");
                        });
                });
        })
        .node("serial", |n| {
            n.compatible(&["sandbox,serial"])
                .strings("pinctrl-names", &["default", "sleep"])
                .u32("pinctrl-0", 1)
                .u32("pinctrl-1", 2);
        })
        .node("serial-bad", |n| {
            n.compatible(&["sandbox,serial"])
                .strings("pinctrl-names", &["default"])
                .u32s("pinctrl-0", &[6, 99, 5]);
        })
        .build()
}

/// The model and its probed sandbox controller
fn setup() -> (DriverModel, DevId) {
    let mut dm = scanned(pinctrl_tree());
    let pctl = by_name(&dm, "pinctrl");
    dm.probe(pctl).unwrap();
    (dm, pctl)
}

fn apply(dm: &mut DriverModel, pctl: DevId, config: &str) -> device::Result<()> {
    let node = dm.ofnode(by_name(dm, config)).unwrap();
    generic::apply(dm, pctl, &node, None)
}

#[test]
fn config_subnodes_are_bound_as_pinconfig_devices() {
    let dm = scanned(pinctrl_tree());
    let names: Vec<&str> = dm
        .uclass_devices(ClassId::Pinconfig)
        .iter()
        .map(|d| dm.name(*d))
        .collect();

    assert_eq!(
        names,
        ["uart_default", "uart_sleep", "i2c", "w1", "nested", "spi", "gpio", "bad_pin", "input", "mux", "mux_pin"]
    );
    let spi = by_name(&dm, "spi");
    assert_eq!(
        dm.device(spi).unwrap().parent(),
        Some(by_name(&dm, "nested"))
    );
}

#[test]
fn default_state_is_applied_when_the_consumer_probes() {
    let mut dm = scanned(pinctrl_tree());
    let pctl = by_name(&dm, "pinctrl");
    let serial = by_name(&dm, "serial");
    assert!(!dm.is_active(pctl));

    dm.probe(serial).unwrap();
    assert!(dm.is_active(pctl));
    assert_eq!(
        calls(&dm, pctl),
        [PinctrlCall::PinmuxGroupSet { group: 0, function: 1 }]
    );
}

#[test]
fn states_are_selected_by_name_or_number() {
    let mut dm = scanned(pinctrl_tree());
    let pctl = by_name(&dm, "pinctrl");
    let serial = by_name(&dm, "serial");
    dm.probe(serial).unwrap();
    clear_calls(&mut dm, pctl);

    pinctrl::select_state(&mut dm, serial, "sleep").unwrap();
    pinctrl::select_state(&mut dm, serial, "0").unwrap();
    assert_eq!(
        calls(&dm, pctl),
        [
            PinctrlCall::PinmuxGroupSet { group: 1, function: 0 },
            PinctrlCall::PinmuxGroupSet { group: 0, function: 1 },
        ]
    );
    assert_eq!(
        pinctrl::select_state(&mut dm, serial, "idle"),
        Err(ErrorKind::NotImplemented)
    );
    assert_eq!(
        pinctrl::select_state(&mut dm, pctl, "default"),
        Err(ErrorKind::NotImplemented)
    );
}

#[test]
fn broken_configurations_do_not_stop_a_state() {
    let mut dm = scanned(pinctrl_tree());
    let pctl = by_name(&dm, "pinctrl");
    let serial = by_name(&dm, "serial-bad");

    // Unknown pin, dangling phandle, then a good one
    dm.probe(serial).unwrap();
    assert_eq!(
        calls(&dm, pctl),
        [
            PinctrlCall::PinmuxGroupSet { group: 3, function: 3 },
            PinctrlCall::PinconfSet { pin: 7, param: BIAS_DISABLE, arg: 0 },
        ]
    );
}

#[test]
fn pins_get_function_then_parameters() {
    let (mut dm, pctl) = setup();

    apply(&mut dm, pctl, "i2c").unwrap();
    assert_eq!(
        calls(&dm, pctl),
        [
            PinctrlCall::PinmuxSet { pin: 2, function: 2 },
            PinctrlCall::PinconfSet { pin: 2, param: BIAS_PULL_UP, arg: 1 },
            PinctrlCall::PinconfSet { pin: 2, param: DRIVE_STRENGTH, arg: 8 },
            PinctrlCall::PinmuxSet { pin: 3, function: 2 },
            PinctrlCall::PinconfSet { pin: 3, param: BIAS_PULL_UP, arg: 1 },
            PinctrlCall::PinconfSet { pin: 3, param: DRIVE_STRENGTH, arg: 8 },
        ]
    );
    assert_eq!(pinctrl::get_pin_muxing(&dm, pctl, 2).unwrap(), "i2c");
    assert_eq!(pinctrl::get_pin_muxing(&dm, pctl, 0).unwrap(), "unmuxed");
    assert_eq!(pinctrl::get_pins_count(&dm, pctl), Ok(9));
    assert_eq!(pinctrl::get_pin_name(&dm, pctl, 4), Ok("TX"));
}

#[test]
fn applying_twice_repeats_the_same_calls() {
    let (mut dm, pctl) = setup();

    apply(&mut dm, pctl, "i2c").unwrap();
    let first = calls(&dm, pctl).to_vec();
    clear_calls(&mut dm, pctl);
    apply(&mut dm, pctl, "i2c").unwrap();

    assert_eq!(calls(&dm, pctl), first.as_slice());
}

#[test]
fn raw_pinmux_pairs_mux_groups() {
    let (mut dm, pctl) = setup();

    apply(&mut dm, pctl, "w1").unwrap();
    assert_eq!(
        calls(&dm, pctl),
        [
            PinctrlCall::PinmuxGroupSet { group: 4, function: 4 },
            PinctrlCall::PinconfGroupSet { group: 4, param: BIAS_PULL_UP, arg: 1 },
        ]
    );
}

#[test]
fn nested_nodes_are_applied_in_order() {
    let (mut dm, pctl) = setup();

    apply(&mut dm, pctl, "nested").unwrap();
    assert_eq!(
        calls(&dm, pctl),
        [
            PinctrlCall::PinmuxGroupSet { group: 3, function: 3 },
            PinctrlCall::PinconfSet { pin: 7, param: BIAS_DISABLE, arg: 0 },
        ]
    );
}

#[test]
fn unknown_names_are_reported() {
    let (mut dm, pctl) = setup();

    assert_eq!(apply(&mut dm, pctl, "bad_pin"), Err(ErrorKind::UnknownPin));
    assert!(calls(&dm, pctl).is_empty());
}

#[test]
fn controller_without_mux_still_gets_configured() {
    let mut dm = scanned(pinctrl_tree());
    let pctl = by_name(&dm, "pinctrl-nomux");
    dm.probe(pctl).unwrap();
    clear_calls(&mut dm, pctl);

    apply(&mut dm, pctl, "mux").unwrap();
    assert_eq!(
        calls(&dm, pctl),
        [
            PinctrlCall::PinconfGroupSet { group: 2, param: BIAS_PULL_UP, arg: 1 },
            PinctrlCall::PinconfSet { pin: 0, param: INPUT_ENABLE, arg: 1 },
        ]
    );

    clear_calls(&mut dm, pctl);
    apply(&mut dm, pctl, "input").unwrap();
    assert_eq!(
        calls(&dm, pctl),
        [PinctrlCall::PinconfSet { pin: 0, param: INPUT_ENABLE, arg: 1 }]
    );
}
