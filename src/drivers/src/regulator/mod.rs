//! Regulator uclass
//!
//! Every regulator carries a [`RegulatorPlat`] with the constraints from its
//! node. The uclass reads them before the driver probes and, once the driver
//! is up, applies them through [`autoset`]. Consumers go through the
//! functions in this module rather than calling the operations table
//! directly, so range checks, the always-on guard and ramp delays apply.

use alloc::string::String;
use bitflags::bitflags;
use device::{
    auto, invoke, ClassDriver, ClassId, ClassOps, DevId, DriverModel, ErrorKind, Result,
};
use log::{debug, error, warn};

pub mod fixed;
#[cfg(feature = "sandbox")]
pub mod sandbox;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RegulatorType {
    Ldo,
    Buck,
    Dvs,
    Fixed,
    Gpio,
    #[default]
    Other,
}

bitflags! {
    #[derive(Default)]
    pub struct RegulatorFlags: u32 {
        /// Minimum and maximum voltage are equal, set it at autoset
        const AUTOSET_UV = 1 << 0;
        /// Minimum and maximum current are equal, set it at autoset
        const AUTOSET_UA = 1 << 1;
        /// Autoset already ran for this regulator
        const AUTOSET_DONE = 1 << 2;
    }
}

/// Constraints shared by every regulator driver
///
/// Voltages are in microvolts, currents in microamps; `None` means the node
/// does not constrain the value.
#[derive(Clone, Debug, Default)]
pub struct RegulatorPlat {
    pub type_: RegulatorType,
    pub name: String,
    pub min_uv: Option<i32>,
    pub max_uv: Option<i32>,
    pub init_uv: Option<i32>,
    pub min_ua: Option<i32>,
    pub max_ua: Option<i32>,
    pub always_on: bool,
    pub boot_on: bool,
    pub force_off: bool,
    /// Slew rate in microvolts per microsecond, 0 when unknown
    pub ramp_delay: u32,
    pub suspend_on: bool,
    pub suspend_uv: Option<i32>,
    pub flags: RegulatorFlags,
}

impl RegulatorPlat {
    fn check_uv(&self, uv: i32) -> Result<()> {
        check_range(uv, self.min_uv, self.max_uv)
    }

    fn check_ua(&self, ua: i32) -> Result<()> {
        check_range(ua, self.min_ua, self.max_ua)
    }
}

fn check_range(value: i32, min: Option<i32>, max: Option<i32>) -> Result<()> {
    if min.is_some_and(|min| value < min) || max.is_some_and(|max| value > max) {
        return Err(ErrorKind::InvalidArgument);
    }
    Ok(())
}

/// Regulator operations
///
/// Getters report `NotImplemented` when the hardware cannot tell.
pub struct RegulatorOps {
    pub get_value: Option<fn(&mut DriverModel, DevId) -> Result<i32>>,
    pub set_value: Option<fn(&mut DriverModel, DevId, i32) -> Result<()>>,
    pub get_suspend_value: Option<fn(&mut DriverModel, DevId) -> Result<i32>>,
    pub set_suspend_value: Option<fn(&mut DriverModel, DevId, i32) -> Result<()>>,
    pub get_current: Option<fn(&mut DriverModel, DevId) -> Result<i32>>,
    pub set_current: Option<fn(&mut DriverModel, DevId, i32) -> Result<()>>,
    pub get_enable: Option<fn(&mut DriverModel, DevId) -> Result<bool>>,
    pub set_enable: Option<fn(&mut DriverModel, DevId, bool) -> Result<()>>,
    pub get_suspend_enable: Option<fn(&mut DriverModel, DevId) -> Result<bool>>,
    pub set_suspend_enable: Option<fn(&mut DriverModel, DevId, bool) -> Result<()>>,
    pub get_mode: Option<fn(&mut DriverModel, DevId) -> Result<i32>>,
    pub set_mode: Option<fn(&mut DriverModel, DevId, i32) -> Result<()>>,
}

impl RegulatorOps {
    pub const fn new() -> Self {
        Self {
            get_value: None,
            set_value: None,
            get_suspend_value: None,
            set_suspend_value: None,
            get_current: None,
            set_current: None,
            get_enable: None,
            set_enable: None,
            get_suspend_enable: None,
            set_suspend_enable: None,
            get_mode: None,
            set_mode: None,
        }
    }
}

impl ClassOps for RegulatorOps {
    const CLASS: ClassId = ClassId::Regulator;
}

/// Result of a successful [`autoset`]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AutosetStatus {
    /// The constraints were applied by this call
    Applied,
    /// An earlier call applied them
    AlreadyDone,
    /// The regulator is neither always-on nor boot-on
    NothingToDo,
}

pub fn plat(dm: &DriverModel, dev: DevId) -> Result<&RegulatorPlat> {
    dm.uclass_plat::<RegulatorPlat>(dev)
        .ok_or(ErrorKind::InvalidState)
}

fn plat_mut(dm: &mut DriverModel, dev: DevId) -> Result<&mut RegulatorPlat> {
    dm.uclass_plat_mut::<RegulatorPlat>(dev)
        .ok_or(ErrorKind::InvalidState)
}

fn ramp_wait(dm: &DriverModel, dev: DevId, old_uv: i32, new_uv: i32, ramp_delay: u32) {
    let delta = new_uv.abs_diff(old_uv);
    let us = delta.div_ceil(ramp_delay);
    debug!(
        "{}: ramp {} -> {} uV, waiting {} us",
        dm.name(dev),
        old_uv,
        new_uv,
        us
    );
    dm.udelay(us);
}

pub fn get_value(dm: &mut DriverModel, dev: DevId) -> Result<i32> {
    invoke!(dm, dev, RegulatorOps, get_value)
}

/// Set the output voltage within the regulator's constraints
///
/// With a ramp delay configured and the output on, waits for the output to
/// slew from the old value to the new one.
pub fn set_value(dm: &mut DriverModel, dev: DevId, uv: i32) -> Result<()> {
    let (ramp_delay, check) = {
        let plat = plat(dm, dev)?;
        (plat.ramp_delay, plat.check_uv(uv))
    };
    check?;
    write_value(dm, dev, uv, ramp_delay)
}

/// Set the output voltage, ignoring the constraints
pub fn set_value_force(dm: &mut DriverModel, dev: DevId, uv: i32) -> Result<()> {
    let ramp_delay = plat(dm, dev)?.ramp_delay;
    write_value(dm, dev, uv, ramp_delay)
}

fn write_value(dm: &mut DriverModel, dev: DevId, uv: i32, ramp_delay: u32) -> Result<()> {
    let old = if ramp_delay > 0 {
        let enabled = get_enable(dm, dev).unwrap_or(true);
        get_value(dm, dev).ok().filter(|old| enabled && *old > 0)
    } else {
        None
    };
    invoke!(dm, dev, RegulatorOps, set_value, uv)?;
    if let Some(old) = old {
        ramp_wait(dm, dev, old, uv, ramp_delay);
    }
    Ok(())
}

pub fn get_suspend_value(dm: &mut DriverModel, dev: DevId) -> Result<i32> {
    invoke!(dm, dev, RegulatorOps, get_suspend_value)
}

pub fn set_suspend_value(dm: &mut DriverModel, dev: DevId, uv: i32) -> Result<()> {
    plat(dm, dev)?.check_uv(uv)?;
    invoke!(dm, dev, RegulatorOps, set_suspend_value, uv)
}

pub fn get_current(dm: &mut DriverModel, dev: DevId) -> Result<i32> {
    invoke!(dm, dev, RegulatorOps, get_current)
}

pub fn set_current(dm: &mut DriverModel, dev: DevId, ua: i32) -> Result<()> {
    plat(dm, dev)?.check_ua(ua)?;
    invoke!(dm, dev, RegulatorOps, set_current, ua)
}

pub fn get_enable(dm: &mut DriverModel, dev: DevId) -> Result<bool> {
    invoke!(dm, dev, RegulatorOps, get_enable)
}

/// Switch the output on or off
///
/// An always-on regulator refuses to be switched off with
/// `PermissionDenied`.
pub fn set_enable(dm: &mut DriverModel, dev: DevId, enable: bool) -> Result<()> {
    if !enable && plat(dm, dev)?.always_on {
        return Err(ErrorKind::PermissionDenied);
    }
    write_enable(dm, dev, enable)
}

fn write_enable(dm: &mut DriverModel, dev: DevId, enable: bool) -> Result<()> {
    let ramp_delay = plat(dm, dev)?.ramp_delay;
    let was_on = if ramp_delay > 0 {
        get_enable(dm, dev).ok()
    } else {
        None
    };
    invoke!(dm, dev, RegulatorOps, set_enable, enable)?;
    if enable && was_on == Some(false) {
        if let Ok(uv) = get_value(dm, dev) {
            if uv > 0 {
                ramp_wait(dm, dev, 0, uv, ramp_delay);
            }
        }
    }
    Ok(())
}

/// [`set_enable`] for callers that do not care whether the regulator can be
/// switched
///
/// A missing enable operation and an always-on refusal count as success.
/// When disabling, so does a regulator that reports it is busy.
pub fn set_enable_if_allowed(dm: &mut DriverModel, dev: DevId, enable: bool) -> Result<()> {
    match set_enable(dm, dev, enable) {
        Err(ErrorKind::NotImplemented | ErrorKind::PermissionDenied) => Ok(()),
        Err(e) if !enable && e.is_benign_disable() => Ok(()),
        other => other,
    }
}

pub fn get_suspend_enable(dm: &mut DriverModel, dev: DevId) -> Result<bool> {
    invoke!(dm, dev, RegulatorOps, get_suspend_enable)
}

pub fn set_suspend_enable(dm: &mut DriverModel, dev: DevId, enable: bool) -> Result<()> {
    invoke!(dm, dev, RegulatorOps, set_suspend_enable, enable)
}

pub fn get_mode(dm: &mut DriverModel, dev: DevId) -> Result<i32> {
    invoke!(dm, dev, RegulatorOps, get_mode)
}

pub fn set_mode(dm: &mut DriverModel, dev: DevId, mode: i32) -> Result<()> {
    invoke!(dm, dev, RegulatorOps, set_mode, mode)
}

/// Apply the regulator's constraints, once
///
/// Suspend settings go first. Then a forced-off regulator is switched off,
/// and a regulator that is neither always-on nor boot-on is left alone.
/// Otherwise the pinned voltage (or the initial one) and the pinned current
/// are set, and the output is switched on even if setting a value failed.
/// The first error is returned. Whatever the outcome, later calls report
/// [`AutosetStatus::AlreadyDone`] without touching the hardware.
pub fn autoset(dm: &mut DriverModel, dev: DevId) -> Result<AutosetStatus> {
    let plat = plat(dm, dev)?.clone();
    if plat.flags.contains(RegulatorFlags::AUTOSET_DONE) {
        return Ok(AutosetStatus::AlreadyDone);
    }
    plat_mut(dm, dev)?.flags.insert(RegulatorFlags::AUTOSET_DONE);

    apply_suspend(dm, dev, &plat)?;

    if plat.force_off {
        write_enable(dm, dev, false)?;
        return Ok(AutosetStatus::Applied);
    }
    if !plat.always_on && !plat.boot_on {
        return Ok(AutosetStatus::NothingToDo);
    }
    if plat.type_ == RegulatorType::Fixed {
        set_enable(dm, dev, true)?;
        return Ok(AutosetStatus::Applied);
    }

    let mut first = None;
    let uv = if plat.flags.contains(RegulatorFlags::AUTOSET_UV) {
        plat.min_uv
    } else {
        plat.init_uv
    };
    if let Some(uv) = uv {
        if let Err(e) = set_value(dm, dev, uv) {
            warn!("{}: cannot set {} uV: {}", plat.name, uv, e);
            first.get_or_insert(e);
        }
    }
    if first.is_none() && plat.flags.contains(RegulatorFlags::AUTOSET_UA) {
        if let Some(ua) = plat.min_ua {
            if let Err(e) = set_current(dm, dev, ua) {
                warn!("{}: cannot set {} uA: {}", plat.name, ua, e);
                first.get_or_insert(e);
            }
        }
    }
    if let Err(e) = set_enable(dm, dev, true) {
        first.get_or_insert(e);
    }

    match first {
        Some(e) => Err(e),
        None => Ok(AutosetStatus::Applied),
    }
}

fn apply_suspend(dm: &mut DriverModel, dev: DevId, plat: &RegulatorPlat) -> Result<()> {
    let result = set_suspend_enable(dm, dev, plat.suspend_on).and_then(|()| {
        match plat.suspend_uv {
            Some(uv) if plat.suspend_on => set_suspend_value(dm, dev, uv),
            _ => Ok(()),
        }
    });
    match result {
        Err(ErrorKind::NotImplemented) | Ok(()) => Ok(()),
        Err(e) => {
            error!("{}: cannot apply suspend state: {}", plat.name, e);
            Err(e)
        }
    }
}

/// Probe the regulator called `plat_name` and autoset it
pub fn autoset_by_name(dm: &mut DriverModel, plat_name: &str) -> Result<DevId> {
    let dev = get_by_platname(dm, plat_name)?;
    autoset(dm, dev)?;
    Ok(dev)
}

/// [`autoset_by_name`] for each name, reporting the first failure
pub fn list_autoset(dm: &mut DriverModel, names: &[&str]) -> Result<()> {
    let mut first = None;
    for name in names {
        if let Err(e) = autoset_by_name(dm, name) {
            warn!("regulator '{}': autoset failed: {}", name, e);
            first.get_or_insert(e);
        }
    }
    first.map_or(Ok(()), Err)
}

/// Find a regulator by its `regulator-name` and probe it
pub fn get_by_platname(dm: &mut DriverModel, plat_name: &str) -> Result<DevId> {
    let dev = dm
        .uclass_devices(ClassId::Regulator)
        .iter()
        .copied()
        .find(|d| plat(dm, *d).is_ok_and(|p| p.name == plat_name))
        .ok_or_else(|| {
            debug!("regulator '{}' not found", plat_name);
            ErrorKind::NotFound
        })?;
    dm.probe(dev)?;
    Ok(dev)
}

/// Find a regulator by device name and probe it
pub fn get_by_devname(dm: &mut DriverModel, devname: &str) -> Result<DevId> {
    dm.uclass_get_device_by_name(ClassId::Regulator, devname)
}

/// The regulator a device's `<supply>` property points at, probed
pub fn device_get_supply_regulator(
    dm: &mut DriverModel,
    dev: DevId,
    supply: &str,
) -> Result<DevId> {
    dm.uclass_get_device_by_phandle(ClassId::Regulator, dev, supply)
}

/// Probe every regulator, which applies the boot-time constraints
pub fn enable_boot_on(dm: &mut DriverModel) -> Result<()> {
    let devices = dm.uclass_devices(ClassId::Regulator).to_vec();
    let mut first = None;
    for dev in devices {
        let result = dm.probe(dev).and_then(|()| autoset(dm, dev));
        if let Err(e) = result {
            warn!("{}: boot-on failed: {}", dm.name(dev), e);
            first.get_or_insert(e);
        }
    }
    first.map_or(Ok(()), Err)
}

/// Switch off every active regulator marked to be forced off
pub fn enable_boot_off(dm: &mut DriverModel) -> Result<()> {
    let devices = dm.uclass_devices(ClassId::Regulator).to_vec();
    let mut first = None;
    for dev in devices {
        if !dm.is_active(dev) || !plat(dm, dev)?.force_off {
            continue;
        }
        if let Err(e) = write_enable(dm, dev, false) {
            warn!("{}: boot-off failed: {}", dm.name(dev), e);
            first.get_or_insert(e);
        }
    }
    first.map_or(Ok(()), Err)
}

fn regulator_post_bind(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let node = dm.ofnode(dev);
    let name = node
        .as_ref()
        .and_then(|n| n.read_string("regulator-name"))
        .map_or_else(|| String::from(dm.name(dev)), String::from);

    let clash = dm
        .uclass_devices(ClassId::Regulator)
        .iter()
        .any(|other| *other != dev && plat(dm, *other).is_ok_and(|p| p.name == name));
    if clash {
        error!("regulator name '{}' already in use", name);
        return Err(ErrorKind::DuplicateIdentity);
    }

    let wanted = node.is_some_and(|n| {
        n.read_bool("regulator-always-on") || n.read_bool("regulator-boot-on")
    });
    plat_mut(dm, dev)?.name = name;
    if wanted {
        dm.set_probe_after_bind(dev)?;
    }
    Ok(())
}

/// Read a signed cell; values past `i32::MAX` are rejected
fn read_i32(node: &oreboot_fdt::Ofnode, name: &str) -> Result<Option<i32>> {
    node.read_u32(name)
        .map(|v| {
            i32::try_from(v).map_err(|_| {
                error!("{}: {} = {} is out of range", node.path(), name, v);
                ErrorKind::InvalidConfig
            })
        })
        .transpose()
}

fn regulator_pre_probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let Some(node) = dm.ofnode(dev) else {
        return Ok(());
    };

    let plat = plat_mut(dm, dev)?;
    plat.min_uv = read_i32(&node, "regulator-min-microvolt")?;
    plat.max_uv = read_i32(&node, "regulator-max-microvolt")?;
    plat.init_uv = read_i32(&node, "regulator-init-microvolt")?;
    plat.min_ua = read_i32(&node, "regulator-min-microamp")?;
    plat.max_ua = read_i32(&node, "regulator-max-microamp")?;
    plat.always_on = node.read_bool("regulator-always-on");
    plat.boot_on = node.read_bool("regulator-boot-on");
    plat.force_off = node.read_bool("regulator-force-boot-off");
    plat.ramp_delay = node.read_u32_default("regulator-ramp-delay", 0);

    plat.suspend_on = true;
    plat.suspend_uv = plat.max_uv;
    if let Some(mem) = node.subnode("regulator-state-mem") {
        plat.suspend_on = !mem.read_bool("regulator-off-in-suspend");
        if let Some(uv) = read_i32(&mem, "regulator-suspend-microvolt")? {
            plat.suspend_uv = Some(uv);
        }
    }

    for (min, max, what) in [
        (plat.min_uv, plat.max_uv, "voltage"),
        (plat.min_ua, plat.max_ua, "current"),
    ] {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                error!("{}: inverted {} range {}..{}", plat.name, what, min, max);
                return Err(ErrorKind::InvalidConfig);
            }
        }
    }

    if plat.min_uv.is_some() && plat.min_uv == plat.max_uv {
        plat.flags.insert(RegulatorFlags::AUTOSET_UV);
    }
    if plat.min_ua.is_some() && plat.min_ua == plat.max_ua {
        plat.flags.insert(RegulatorFlags::AUTOSET_UA);
    }
    Ok(())
}

fn regulator_post_probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    match autoset(dm, dev) {
        Ok(status) => {
            debug!("{}: autoset {:?}", dm.name(dev), status);
            Ok(())
        }
        Err(ErrorKind::NotImplemented) => Ok(()),
        Err(e) => Err(e),
    }
}

pub static REGULATOR_CLASS: ClassDriver = ClassDriver {
    name: "regulator",
    id: ClassId::Regulator,
    post_bind: Some(regulator_post_bind),
    pre_probe: Some(regulator_pre_probe),
    post_probe: Some(regulator_post_probe),
    per_device_plat_auto: Some(auto::<RegulatorPlat>),
    ..ClassDriver::new()
};
