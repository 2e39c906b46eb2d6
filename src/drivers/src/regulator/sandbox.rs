//! Sandbox regulators that remember their state and every change made to it
//!
//! The state lives in the driver's platform data, so the record of calls
//! outlives a failed probe. A node with `sandbox,fail-set-value` refuses
//! every voltage change.

use alloc::vec::Vec;
use device::{auto, ClassId, DevId, DeviceId, Driver, DriverModel, ErrorKind, Ops, Result};

use super::RegulatorOps;

/// A state-changing call, in the order the driver saw it
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RegulatorCall {
    SetValue(i32),
    SetSuspendValue(i32),
    SetCurrent(i32),
    SetEnable(bool),
    SetSuspendEnable(bool),
    SetMode(i32),
}

#[derive(Debug, Default)]
pub struct SandboxRegulator {
    pub uv: i32,
    pub ua: i32,
    pub enabled: bool,
    pub mode: i32,
    pub suspend_uv: i32,
    pub suspend_enabled: bool,
    pub calls: Vec<RegulatorCall>,
    fail_set_value: bool,
}

fn state(dm: &mut DriverModel, dev: DevId) -> Result<&mut SandboxRegulator> {
    dm.plat_mut::<SandboxRegulator>(dev)
        .ok_or(ErrorKind::InvalidState)
}

/// Calls recorded so far, oldest first
pub fn calls(dm: &DriverModel, dev: DevId) -> &[RegulatorCall] {
    dm.plat::<SandboxRegulator>(dev)
        .map_or(&[], |s| s.calls.as_slice())
}

/// Forget the recorded calls, keeping the regulator state
pub fn clear_calls(dm: &mut DriverModel, dev: DevId) {
    if let Some(s) = dm.plat_mut::<SandboxRegulator>(dev) {
        s.calls.clear();
    }
}

fn of_to_plat(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let fail = dm
        .ofnode(dev)
        .is_some_and(|n| n.read_bool("sandbox,fail-set-value"));
    state(dm, dev)?.fail_set_value = fail;
    Ok(())
}

fn get_value(dm: &mut DriverModel, dev: DevId) -> Result<i32> {
    Ok(state(dm, dev)?.uv)
}

fn set_value(dm: &mut DriverModel, dev: DevId, uv: i32) -> Result<()> {
    let s = state(dm, dev)?;
    if s.fail_set_value {
        return Err(ErrorKind::HardwareTimeout);
    }
    s.uv = uv;
    s.calls.push(RegulatorCall::SetValue(uv));
    Ok(())
}

fn get_current(dm: &mut DriverModel, dev: DevId) -> Result<i32> {
    Ok(state(dm, dev)?.ua)
}

fn set_current(dm: &mut DriverModel, dev: DevId, ua: i32) -> Result<()> {
    let s = state(dm, dev)?;
    s.ua = ua;
    s.calls.push(RegulatorCall::SetCurrent(ua));
    Ok(())
}

fn get_enable(dm: &mut DriverModel, dev: DevId) -> Result<bool> {
    Ok(state(dm, dev)?.enabled)
}

fn set_enable(dm: &mut DriverModel, dev: DevId, enable: bool) -> Result<()> {
    let s = state(dm, dev)?;
    s.enabled = enable;
    s.calls.push(RegulatorCall::SetEnable(enable));
    Ok(())
}

fn get_mode(dm: &mut DriverModel, dev: DevId) -> Result<i32> {
    Ok(state(dm, dev)?.mode)
}

fn set_mode(dm: &mut DriverModel, dev: DevId, mode: i32) -> Result<()> {
    let s = state(dm, dev)?;
    s.mode = mode;
    s.calls.push(RegulatorCall::SetMode(mode));
    Ok(())
}

fn get_suspend_value(dm: &mut DriverModel, dev: DevId) -> Result<i32> {
    Ok(state(dm, dev)?.suspend_uv)
}

fn set_suspend_value(dm: &mut DriverModel, dev: DevId, uv: i32) -> Result<()> {
    let s = state(dm, dev)?;
    s.suspend_uv = uv;
    s.calls.push(RegulatorCall::SetSuspendValue(uv));
    Ok(())
}

fn get_suspend_enable(dm: &mut DriverModel, dev: DevId) -> Result<bool> {
    Ok(state(dm, dev)?.suspend_enabled)
}

fn set_suspend_enable(dm: &mut DriverModel, dev: DevId, enable: bool) -> Result<()> {
    let s = state(dm, dev)?;
    s.suspend_enabled = enable;
    s.calls.push(RegulatorCall::SetSuspendEnable(enable));
    Ok(())
}

const SANDBOX_OPS: RegulatorOps = RegulatorOps {
    get_value: Some(get_value),
    set_value: Some(set_value),
    get_current: Some(get_current),
    set_current: Some(set_current),
    get_enable: Some(get_enable),
    set_enable: Some(set_enable),
    get_mode: Some(get_mode),
    set_mode: Some(set_mode),
    ..RegulatorOps::new()
};

static SANDBOX_SUSPEND_OPS: RegulatorOps = RegulatorOps {
    get_suspend_value: Some(get_suspend_value),
    set_suspend_value: Some(set_suspend_value),
    get_suspend_enable: Some(get_suspend_enable),
    set_suspend_enable: Some(set_suspend_enable),
    ..SANDBOX_OPS
};

pub static SANDBOX_REGULATOR_DRIVER: Driver = Driver {
    name: "sandbox_regulator",
    id: ClassId::Regulator,
    of_match: &[DeviceId::new("sandbox,regulator")],
    plat_auto: Some(auto::<SandboxRegulator>),
    of_to_plat: Some(of_to_plat),
    ops: Ops::new(&SANDBOX_OPS),
    ..Driver::new()
};

pub static SANDBOX_SUSPEND_REGULATOR_DRIVER: Driver = Driver {
    name: "sandbox_regulator_suspend",
    id: ClassId::Regulator,
    of_match: &[DeviceId::new("sandbox,regulator-suspend")],
    plat_auto: Some(auto::<SandboxRegulator>),
    of_to_plat: Some(of_to_plat),
    ops: Ops::new(&SANDBOX_SUSPEND_OPS),
    ..Driver::new()
};
