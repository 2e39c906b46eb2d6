//! Pin controller and pin configuration uclasses
//!
//! A pin controller's configuration subnodes are bound as `pinconfig`
//! devices below it. A device selects a state by name through its
//! `pinctrl-names` and `pinctrl-N` properties; every configuration the state
//! lists is applied by the controller that owns it, see [`select_state`].

use alloc::{format, string::String};
use device::{
    ClassDriver, ClassId, ClassOps, DevId, DeviceState, Driver, DriverModel, ErrorKind, Result,
};
use log::{debug, warn};
use oreboot_fdt::Ofnode;

pub mod generic;
#[cfg(feature = "sandbox")]
pub mod sandbox;

/// Generic pin configuration parameters
#[repr(u32)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PinConfigParam {
    BiasBusHold = 0,
    BiasDisable,
    BiasHighImpedance,
    BiasPullDown,
    BiasPullPinDefault,
    BiasPullUp,
    DriveOpenDrain,
    DriveOpenSource,
    DrivePushPull,
    DriveStrength,
    DriveStrengthUa,
    InputDebounce,
    InputEnable,
    InputSchmitt,
    InputSchmittEnable,
    LowPowerMode,
    OutputEnable,
    Output,
    PowerSource,
    SlewRate,
    SkewDelay,
}

/// Maps a configuration property to a parameter and the value a bare flag
/// stands for
#[derive(Clone, Copy, Debug)]
pub struct PinconfParam {
    pub property: &'static str,
    pub param: u32,
    pub default_value: u32,
}

impl PinconfParam {
    pub const fn new(property: &'static str, param: PinConfigParam, default_value: u32) -> Self {
        Self {
            property,
            param: param as u32,
            default_value,
        }
    }
}

/// The standard configuration properties, for drivers that support them all
pub const GENERIC_PINCONF_PARAMS: &[PinconfParam] = &[
    PinconfParam::new("bias-bus-hold", PinConfigParam::BiasBusHold, 0),
    PinconfParam::new("bias-disable", PinConfigParam::BiasDisable, 0),
    PinconfParam::new("bias-high-impedance", PinConfigParam::BiasHighImpedance, 0),
    PinconfParam::new("bias-pull-down", PinConfigParam::BiasPullDown, 1),
    PinconfParam::new("bias-pull-pin-default", PinConfigParam::BiasPullPinDefault, 1),
    PinconfParam::new("bias-pull-up", PinConfigParam::BiasPullUp, 1),
    PinconfParam::new("drive-open-drain", PinConfigParam::DriveOpenDrain, 0),
    PinconfParam::new("drive-open-source", PinConfigParam::DriveOpenSource, 0),
    PinconfParam::new("drive-push-pull", PinConfigParam::DrivePushPull, 0),
    PinconfParam::new("drive-strength", PinConfigParam::DriveStrength, 0),
    PinconfParam::new("drive-strength-microamp", PinConfigParam::DriveStrengthUa, 0),
    PinconfParam::new("input-debounce", PinConfigParam::InputDebounce, 0),
    PinconfParam::new("input-disable", PinConfigParam::InputEnable, 0),
    PinconfParam::new("input-enable", PinConfigParam::InputEnable, 1),
    PinconfParam::new("input-schmitt", PinConfigParam::InputSchmitt, 0),
    PinconfParam::new("input-schmitt-disable", PinConfigParam::InputSchmittEnable, 0),
    PinconfParam::new("input-schmitt-enable", PinConfigParam::InputSchmittEnable, 1),
    PinconfParam::new("low-power-disable", PinConfigParam::LowPowerMode, 0),
    PinconfParam::new("low-power-enable", PinConfigParam::LowPowerMode, 1),
    PinconfParam::new("output-disable", PinConfigParam::OutputEnable, 0),
    PinconfParam::new("output-enable", PinConfigParam::OutputEnable, 1),
    PinconfParam::new("output-high", PinConfigParam::Output, 1),
    PinconfParam::new("output-low", PinConfigParam::Output, 0),
    PinconfParam::new("power-source", PinConfigParam::PowerSource, 0),
    PinconfParam::new("slew-rate", PinConfigParam::SlewRate, 0),
    PinconfParam::new("skew-delay", PinConfigParam::SkewDelay, 0),
];

/// Pin controller operations
///
/// The enumeration entries only look at the controller, the rest program
/// it. `set_state` replaces the generic configuration applier for drivers
/// with their own binding.
pub struct PinctrlOps {
    pub get_pins_count: Option<fn(&DriverModel, DevId) -> Result<u32>>,
    pub get_pin_name: Option<fn(&DriverModel, DevId, u32) -> Result<&str>>,
    pub get_groups_count: Option<fn(&DriverModel, DevId) -> Result<u32>>,
    pub get_group_name: Option<fn(&DriverModel, DevId, u32) -> Result<&str>>,
    pub get_functions_count: Option<fn(&DriverModel, DevId) -> Result<u32>>,
    pub get_function_name: Option<fn(&DriverModel, DevId, u32) -> Result<&str>>,
    pub pinmux_set: Option<fn(&mut DriverModel, DevId, u32, u32) -> Result<()>>,
    pub pinmux_group_set: Option<fn(&mut DriverModel, DevId, u32, u32) -> Result<()>>,
    /// Configuration properties the controller understands
    pub pinconf_params: &'static [PinconfParam],
    pub pinconf_set: Option<fn(&mut DriverModel, DevId, u32, u32, u32) -> Result<()>>,
    pub pinconf_group_set: Option<fn(&mut DriverModel, DevId, u32, u32, u32) -> Result<()>>,
    pub set_state: Option<fn(&mut DriverModel, DevId, DevId) -> Result<()>>,
    pub get_pin_muxing: Option<fn(&DriverModel, DevId, u32) -> Result<String>>,
}

impl PinctrlOps {
    pub const fn new() -> Self {
        Self {
            get_pins_count: None,
            get_pin_name: None,
            get_groups_count: None,
            get_group_name: None,
            get_functions_count: None,
            get_function_name: None,
            pinmux_set: None,
            pinmux_group_set: None,
            pinconf_params: &[],
            pinconf_set: None,
            pinconf_group_set: None,
            set_state: None,
            get_pin_muxing: None,
        }
    }
}

impl ClassOps for PinctrlOps {
    const CLASS: ClassId = ClassId::Pinctrl;
}

pub fn get_pins_count(dm: &DriverModel, dev: DevId) -> Result<u32> {
    let f = dm.capability::<PinctrlOps, _>(dev, |ops| ops.get_pins_count)?;
    f(dm, dev)
}

pub fn get_pin_name(dm: &DriverModel, dev: DevId, selector: u32) -> Result<&str> {
    let f = dm.capability::<PinctrlOps, _>(dev, |ops| ops.get_pin_name)?;
    f(dm, dev, selector)
}

/// Human-readable description of how one pin is muxed
pub fn get_pin_muxing(dm: &DriverModel, dev: DevId, selector: u32) -> Result<String> {
    let f = dm.capability::<PinctrlOps, _>(dev, |ops| ops.get_pin_muxing)?;
    f(dm, dev, selector)
}

/// Bind the configuration subnodes of `dev` as `pinconfig` children
///
/// Subnodes with a `compatible` are devices in their own right, and GPIO
/// banks are left to their own uclass.
fn bind_pinconfig_children(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let Some(node) = dm.ofnode(dev) else {
        return Ok(());
    };
    for child in node.children() {
        if child.property("compatible").is_some() || child.read_bool("gpio-controller") {
            continue;
        }
        dm.bind_driver_to_node(dev, PINCONFIG_DRIVER.name, child.name(), Some(child.id()))?;
    }
    Ok(())
}

fn pinctrl_post_bind(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    if let Err(e) = dm.ops::<PinctrlOps>(dev) {
        warn!("{}: no pin controller operations ({}), not binding", dm.name(dev), e);
        return Err(ErrorKind::InvalidConfig);
    }
    bind_pinconfig_children(dm, dev)
}

fn pinctrl_post_probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    match select_default_state(dm, dev) {
        Ok(()) | Err(ErrorKind::NotImplemented) => {}
        Err(e) => debug!("{}: own default state not applied: {}", dm.name(dev), e),
    }
    Ok(())
}

/// Apply one configuration through the pin controller that owns it
fn config_one(dm: &mut DriverModel, config: DevId) -> Result<()> {
    let pctl = dm
        .ancestor_in_class(config, ClassId::Pinctrl)
        .ok_or(ErrorKind::InvalidConfig)?;

    // A controller selecting its own state is still being probed
    if dm.device_state(pctl)? != DeviceState::Probing {
        dm.probe(pctl)?;
    }

    match dm.capability::<PinctrlOps, _>(pctl, |ops| ops.set_state) {
        Ok(set_state) => set_state(dm, pctl, config),
        Err(ErrorKind::NotImplemented) => generic::set_state(dm, pctl, config),
        Err(e) => Err(e),
    }
}

fn state_index(node: &Ofnode, state: &str) -> Result<usize> {
    if let Some(index) = node.string_index("pinctrl-names", state) {
        return Ok(index);
    }
    // An unnamed state is addressed by its number
    state.parse().map_err(|_| ErrorKind::NotImplemented)
}

/// Put the pins of `dev` into the state called `state`
///
/// Each configuration the state lists is applied in order. One that cannot
/// be found or applied is logged and skipped. A device without the state
/// reports `NotImplemented`.
pub fn select_state(dm: &mut DriverModel, dev: DevId, state: &str) -> Result<()> {
    let node = dm.ofnode(dev).ok_or(ErrorKind::NotImplemented)?;
    let index = state_index(&node, state)?;
    let configs = node
        .read_u32_array(&format!("pinctrl-{}", index))
        .ok_or(ErrorKind::NotImplemented)?;

    for phandle in configs {
        let config = dm
            .tree()
            .find_phandle(phandle)
            .ok_or(ErrorKind::NotFound)
            .and_then(|n| dm.uclass_find_device_by_ofnode(ClassId::Pinconfig, n));
        let config = match config {
            Ok(config) => config,
            Err(e) => {
                warn!("{}: no pin configuration {:#x}: {}", dm.name(dev), phandle, e);
                continue;
            }
        };
        if let Err(e) = config_one(dm, config) {
            warn!(
                "{}: pin configuration {} failed: {}",
                dm.name(dev),
                dm.name(config),
                e
            );
        }
    }
    Ok(())
}

/// Select the `default` state; the state hook the driver model runs before
/// probing a device
pub fn select_default_state(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    select_state(dm, dev, "default")
}

pub static PINCTRL_CLASS: ClassDriver = ClassDriver {
    name: "pinctrl",
    id: ClassId::Pinctrl,
    post_bind: Some(pinctrl_post_bind),
    post_probe: Some(pinctrl_post_probe),
    ..ClassDriver::new()
};

pub static PINCONFIG_CLASS: ClassDriver = ClassDriver {
    name: "pinconfig",
    id: ClassId::Pinconfig,
    post_bind: Some(bind_pinconfig_children),
    ..ClassDriver::new()
};

/// Holds one configuration node; the controller above it does the work
pub static PINCONFIG_DRIVER: Driver = Driver {
    name: "pinconfig",
    id: ClassId::Pinconfig,
    ..Driver::new()
};
