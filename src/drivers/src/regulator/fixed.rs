//! Fixed-voltage regulator, switched by an external enable line

use device::{auto, DevId, DeviceId, Driver, DriverModel, ErrorKind, Ops, Result};
use log::debug;

use super::{plat, RegulatorOps, RegulatorPlat, RegulatorType};

#[derive(Debug, Default)]
pub struct FixedPlat {
    /// Time the output needs to settle after being switched on
    pub startup_delay_us: u32,
    /// Time the output must stay off before it may be switched on again
    pub off_on_delay_us: u32,
}

#[derive(Debug, Default)]
struct FixedPriv {
    enabled: bool,
}

fn fixed_of_to_plat(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let node = dm.ofnode(dev).ok_or(ErrorKind::InvalidConfig)?;
    let fixed = dm.plat_mut::<FixedPlat>(dev).ok_or(ErrorKind::InvalidState)?;
    fixed.startup_delay_us = node.read_u32_default("startup-delay-us", 0);
    fixed.off_on_delay_us = node.read_u32_default("off-on-delay-us", 0);

    let uc = dm
        .uclass_plat_mut::<RegulatorPlat>(dev)
        .ok_or(ErrorKind::InvalidState)?;
    uc.type_ = RegulatorType::Fixed;
    Ok(())
}

fn fixed_get_value(dm: &mut DriverModel, dev: DevId) -> Result<i32> {
    let uc = plat(dm, dev)?;
    match (uc.min_uv, uc.max_uv) {
        (Some(min), Some(max)) if min == max => Ok(min),
        _ => Err(ErrorKind::InvalidConfig),
    }
}

fn fixed_get_current(dm: &mut DriverModel, dev: DevId) -> Result<i32> {
    let uc = plat(dm, dev)?;
    match (uc.min_ua, uc.max_ua) {
        (Some(min), Some(max)) if min == max => Ok(min),
        _ => Err(ErrorKind::InvalidConfig),
    }
}

fn fixed_get_enable(dm: &mut DriverModel, dev: DevId) -> Result<bool> {
    dm.priv_::<FixedPriv>(dev)
        .map(|p| p.enabled)
        .ok_or(ErrorKind::InvalidState)
}

fn fixed_set_enable(dm: &mut DriverModel, dev: DevId, enable: bool) -> Result<()> {
    let priv_ = dm.priv_mut::<FixedPriv>(dev).ok_or(ErrorKind::InvalidState)?;
    if priv_.enabled == enable {
        return Ok(());
    }
    priv_.enabled = enable;
    debug!("{}: {}", dm.name(dev), if enable { "on" } else { "off" });

    let fixed = dm.plat::<FixedPlat>(dev).ok_or(ErrorKind::InvalidState)?;
    let delay = if enable {
        fixed.startup_delay_us
    } else {
        fixed.off_on_delay_us
    };
    dm.udelay(delay);
    Ok(())
}

static FIXED_OPS: RegulatorOps = RegulatorOps {
    get_value: Some(fixed_get_value),
    get_current: Some(fixed_get_current),
    get_enable: Some(fixed_get_enable),
    set_enable: Some(fixed_set_enable),
    ..RegulatorOps::new()
};

pub static FIXED_REGULATOR_DRIVER: Driver = Driver {
    name: "regulator_fixed",
    id: device::ClassId::Regulator,
    of_match: &[DeviceId::new("regulator-fixed")],
    of_to_plat: Some(fixed_of_to_plat),
    plat_auto: Some(auto::<FixedPlat>),
    priv_auto: Some(auto::<FixedPriv>),
    ops: Ops::new(&FIXED_OPS),
    ..Driver::new()
};
