//! Generic pin configuration applier
//!
//! Decodes the standard pin configuration binding into calls on the pin
//! controller's operations table. A configuration node names its targets
//! with `pins`, `groups` or raw `pinmux` (group, function) pairs, tried in
//! that order. Every other property is either the mux `function` or a
//! configuration parameter from the controller's table; anything else is
//! skipped. Subnodes are applied after the node itself. A mux or
//! configuration call the controller does not implement is skipped; names
//! the controller does not know are errors.
//!
//! Nothing is remembered between applications: applying a node twice makes
//! the same calls twice.

use alloc::{format, string::String, vec::Vec};
use device::{invoke, DevId, DriverModel, ErrorKind, Result};
use log::{debug, error, trace};
use oreboot_fdt::Ofnode;

use super::PinctrlOps;

type CountFn = fn(&DriverModel, DevId) -> Result<u32>;
type NameFn = fn(&DriverModel, DevId, u32) -> Result<&str>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Target {
    Pin,
    Group,
}

/// Apply the node of pin configuration device `config` through `pctl`
pub fn set_state(dm: &mut DriverModel, pctl: DevId, config: DevId) -> Result<()> {
    let node = dm.ofnode(config).ok_or(ErrorKind::InvalidConfig)?;
    apply(dm, pctl, &node, None)
}

/// Apply a configuration node, then its subnodes
///
/// With a `prefix` only properties named `<prefix>,<name>` are looked at.
pub fn apply(dm: &mut DriverModel, pctl: DevId, node: &Ofnode, prefix: Option<&str>) -> Result<()> {
    apply_node(dm, pctl, node, prefix)?;
    for child in node.children() {
        apply(dm, pctl, &child, prefix)?;
    }
    Ok(())
}

/// Treat a missing operation as a step to skip
fn skip_missing(node: &Ofnode, what: &str, res: Result<()>) -> Result<()> {
    match res {
        Err(ErrorKind::NotImplemented) => {
            debug!("{}: controller has no {}, skipped", node.path(), what);
            Ok(())
        }
        res => res,
    }
}

fn prop_name(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{},{}", prefix, name),
        None => String::from(name),
    }
}

fn strip_prefix<'a>(prefix: Option<&str>, name: &'a str) -> Option<&'a str> {
    match prefix {
        Some(prefix) => name.strip_prefix(prefix)?.strip_prefix(','),
        None => Some(name),
    }
}

fn apply_node(dm: &mut DriverModel, pctl: DevId, node: &Ofnode, prefix: Option<&str>) -> Result<()> {
    let pins = node.read_string_list(&prop_name(prefix, "pins"));
    if !pins.is_empty() {
        for pin in pins {
            let selector = lookup(dm, pctl, pin, |o| o.get_pins_count, |o| o.get_pin_name)?
                .ok_or_else(|| {
                    error!("{}: unknown pin '{}'", node.path(), pin);
                    ErrorKind::UnknownPin
                })?;
            apply_one(dm, pctl, node, prefix, Target::Pin, selector, true)?;
        }
        return Ok(());
    }

    let groups = node.read_string_list(&prop_name(prefix, "groups"));
    if !groups.is_empty() {
        for group in groups {
            let selector = lookup(dm, pctl, group, |o| o.get_groups_count, |o| o.get_group_name)?
                .ok_or_else(|| {
                    error!("{}: unknown group '{}'", node.path(), group);
                    ErrorKind::UnknownGroup
                })?;
            apply_one(dm, pctl, node, prefix, Target::Group, selector, true)?;
        }
        return Ok(());
    }

    let raw: Vec<u32> = node
        .read_u32_array(&prop_name(prefix, "pinmux"))
        .unwrap_or_default();
    if !raw.is_empty() {
        if raw.len() % 2 != 0 {
            error!("{}: pinmux is not a list of pairs", node.path());
            return Err(ErrorKind::InvalidConfig);
        }
        for pair in raw.chunks_exact(2) {
            let (group, function) = (pair[0], pair[1]);
            trace!("{}: raw mux group {} function {}", node.path(), group, function);
            let res = invoke!(dm, pctl, PinctrlOps, pinmux_group_set, group, function);
            skip_missing(node, "pinmux_group_set", res)?;
            apply_one(dm, pctl, node, prefix, Target::Group, group, false)?;
        }
        return Ok(());
    }

    // Only holds subnodes
    trace!("{}: no pins, groups or pinmux", node.path());
    Ok(())
}

/// Resolve a name to its selector by walking the controller's list
fn lookup(
    dm: &DriverModel,
    pctl: DevId,
    name: &str,
    count: fn(&PinctrlOps) -> Option<CountFn>,
    get: fn(&PinctrlOps) -> Option<NameFn>,
) -> Result<Option<u32>> {
    let count = dm.capability::<PinctrlOps, _>(pctl, count)?;
    let get = dm.capability::<PinctrlOps, _>(pctl, get)?;
    for selector in 0..count(dm, pctl)? {
        if get(dm, pctl, selector)? == name {
            return Ok(Some(selector));
        }
    }
    Ok(None)
}

/// Apply the function and configuration properties of `node` to one target
fn apply_one(
    dm: &mut DriverModel,
    pctl: DevId,
    node: &Ofnode,
    prefix: Option<&str>,
    target: Target,
    selector: u32,
    mux: bool,
) -> Result<()> {
    let params = dm.ops::<PinctrlOps>(pctl)?.pinconf_params;

    for prop in node.properties() {
        let Some(name) = strip_prefix(prefix, prop.name()) else {
            continue;
        };

        if name == "function" {
            // Raw pinmux entries carry their own function
            if !mux {
                continue;
            }
            let func_name = prop.as_str().ok_or(ErrorKind::InvalidConfig)?;
            let func = lookup(
                dm,
                pctl,
                func_name,
                |o| o.get_functions_count,
                |o| o.get_function_name,
            )?
            .ok_or_else(|| {
                error!("{}: unknown function '{}'", node.path(), func_name);
                ErrorKind::InvalidConfig
            })?;
            trace!("{}: {:?} {} function {}", node.path(), target, selector, func);
            let res = match target {
                Target::Pin => invoke!(dm, pctl, PinctrlOps, pinmux_set, selector, func),
                Target::Group => invoke!(dm, pctl, PinctrlOps, pinmux_group_set, selector, func),
            };
            skip_missing(node, "mux operation", res)?;
            continue;
        }

        let Some(param) = params.iter().find(|p| p.property == name) else {
            trace!("{}: skipping '{}'", node.path(), prop.name());
            continue;
        };
        let arg = prop.as_u32().unwrap_or(param.default_value);
        trace!("{}: {:?} {} {} = {}", node.path(), target, selector, name, arg);
        let res = match target {
            Target::Pin => invoke!(dm, pctl, PinctrlOps, pinconf_set, selector, param.param, arg),
            Target::Group => {
                invoke!(dm, pctl, PinctrlOps, pinconf_group_set, selector, param.param, arg)
            }
        };
        skip_missing(node, name, res)?;
    }
    Ok(())
}
