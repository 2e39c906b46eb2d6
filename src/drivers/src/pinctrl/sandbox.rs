//! Sandbox pin controller recording every call made to it

use alloc::{collections::BTreeMap, string::String, vec::Vec};
use device::{auto, ClassId, DevId, DeviceId, Driver, DriverModel, ErrorKind, Ops, Result};

use super::{PinConfigParam, PinconfParam, PinctrlOps, GENERIC_PINCONF_PARAMS};

pub static PINS: &[&str] = &["A", "B", "SCL", "SDA", "TX", "RX", "W1", "GPIO0", "GPIO1"];
pub static GROUPS: &[&str] = &["uart_default", "uart_sleep", "i2c", "spi", "w1"];
pub static FUNCTIONS: &[&str] = &["gpio", "uart", "i2c", "spi", "w1"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PinctrlCall {
    PinmuxSet { pin: u32, function: u32 },
    PinmuxGroupSet { group: u32, function: u32 },
    PinconfSet { pin: u32, param: u32, arg: u32 },
    PinconfGroupSet { group: u32, param: u32, arg: u32 },
}

#[derive(Debug, Default)]
pub struct SandboxPinctrl {
    pub calls: Vec<PinctrlCall>,
    /// Function currently selected for each muxed pin
    muxing: BTreeMap<u32, u32>,
}

/// Calls recorded so far, oldest first
pub fn calls(dm: &DriverModel, dev: DevId) -> &[PinctrlCall] {
    dm.priv_::<SandboxPinctrl>(dev)
        .map_or(&[], |s| s.calls.as_slice())
}

pub fn clear_calls(dm: &mut DriverModel, dev: DevId) {
    if let Some(s) = dm.priv_mut::<SandboxPinctrl>(dev) {
        s.calls.clear();
    }
}

fn state(dm: &mut DriverModel, dev: DevId) -> Result<&mut SandboxPinctrl> {
    dm.priv_mut::<SandboxPinctrl>(dev)
        .ok_or(ErrorKind::InvalidState)
}

fn name_at(table: &'static [&'static str], selector: u32) -> Result<&'static str> {
    table
        .get(selector as usize)
        .copied()
        .ok_or(ErrorKind::InvalidArgument)
}

fn get_pins_count(_: &DriverModel, _: DevId) -> Result<u32> {
    Ok(PINS.len() as u32)
}

fn get_pin_name(_: &DriverModel, _: DevId, selector: u32) -> Result<&str> {
    name_at(PINS, selector)
}

fn get_groups_count(_: &DriverModel, _: DevId) -> Result<u32> {
    Ok(GROUPS.len() as u32)
}

fn get_group_name(_: &DriverModel, _: DevId, selector: u32) -> Result<&str> {
    name_at(GROUPS, selector)
}

fn get_functions_count(_: &DriverModel, _: DevId) -> Result<u32> {
    Ok(FUNCTIONS.len() as u32)
}

fn get_function_name(_: &DriverModel, _: DevId, selector: u32) -> Result<&str> {
    name_at(FUNCTIONS, selector)
}

fn pinmux_set(dm: &mut DriverModel, dev: DevId, pin: u32, function: u32) -> Result<()> {
    let s = state(dm, dev)?;
    s.muxing.insert(pin, function);
    s.calls.push(PinctrlCall::PinmuxSet { pin, function });
    Ok(())
}

fn pinmux_group_set(dm: &mut DriverModel, dev: DevId, group: u32, function: u32) -> Result<()> {
    state(dm, dev)?
        .calls
        .push(PinctrlCall::PinmuxGroupSet { group, function });
    Ok(())
}

fn pinconf_set(dm: &mut DriverModel, dev: DevId, pin: u32, param: u32, arg: u32) -> Result<()> {
    state(dm, dev)?
        .calls
        .push(PinctrlCall::PinconfSet { pin, param, arg });
    Ok(())
}

fn pinconf_group_set(
    dm: &mut DriverModel,
    dev: DevId,
    group: u32,
    param: u32,
    arg: u32,
) -> Result<()> {
    state(dm, dev)?
        .calls
        .push(PinctrlCall::PinconfGroupSet { group, param, arg });
    Ok(())
}

fn get_pin_muxing(dm: &DriverModel, dev: DevId, selector: u32) -> Result<String> {
    name_at(PINS, selector)?;
    let s = dm
        .priv_::<SandboxPinctrl>(dev)
        .ok_or(ErrorKind::InvalidState)?;
    Ok(match s.muxing.get(&selector) {
        Some(f) => String::from(name_at(FUNCTIONS, *f)?),
        None => String::from("unmuxed"),
    })
}

/// Bias and drive strength only
const SANDBOX_PARAMS: &[PinconfParam] = &[
    PinconfParam::new("bias-disable", PinConfigParam::BiasDisable, 0),
    PinconfParam::new("bias-pull-up", PinConfigParam::BiasPullUp, 1),
    PinconfParam::new("bias-pull-down", PinConfigParam::BiasPullDown, 1),
    PinconfParam::new("drive-strength", PinConfigParam::DriveStrength, 0),
];

const SANDBOX_OPS: PinctrlOps = PinctrlOps {
    get_pins_count: Some(get_pins_count),
    get_pin_name: Some(get_pin_name),
    get_groups_count: Some(get_groups_count),
    get_group_name: Some(get_group_name),
    get_functions_count: Some(get_functions_count),
    get_function_name: Some(get_function_name),
    pinmux_set: Some(pinmux_set),
    pinmux_group_set: Some(pinmux_group_set),
    pinconf_params: SANDBOX_PARAMS,
    pinconf_set: Some(pinconf_set),
    pinconf_group_set: Some(pinconf_group_set),
    get_pin_muxing: Some(get_pin_muxing),
    ..PinctrlOps::new()
};

/// Understands every standard parameter but cannot mux
const SANDBOX_NOMUX_OPS: PinctrlOps = PinctrlOps {
    pinmux_set: None,
    pinmux_group_set: None,
    pinconf_params: GENERIC_PINCONF_PARAMS,
    ..SANDBOX_OPS
};

pub static SANDBOX_PINCTRL_DRIVER: Driver = Driver {
    name: "sandbox_pinctrl",
    id: ClassId::Pinctrl,
    of_match: &[DeviceId::new("sandbox,pinctrl")],
    priv_auto: Some(auto::<SandboxPinctrl>),
    ops: Ops::new(&SANDBOX_OPS),
    ..Driver::new()
};

pub static SANDBOX_PINCTRL_NOMUX_DRIVER: Driver = Driver {
    name: "sandbox_pinctrl_nomux",
    id: ClassId::Pinctrl,
    of_match: &[DeviceId::new("sandbox,pinctrl-nomux")],
    priv_auto: Some(auto::<SandboxPinctrl>),
    ops: Ops::new(&SANDBOX_NOMUX_OPS),
    ..Driver::new()
};
