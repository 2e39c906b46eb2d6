//! Sandbox switch using a two byte tag in front of every frame

use alloc::vec::Vec;

use device::{auto, ClassId, DevId, DeviceId, Driver, DriverModel, ErrorKind, Ops, Result};

use super::dsa::{self, DsaOps, Phy, PhyKind};

const TAG_MAGIC: u8 = 0xd5;
const TAG_LEN: u32 = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DsaCall {
    PortProbe { port: u32, phy: PhyKind },
    PortEnable(u32),
    PortDisable(u32),
    Xmit(u32),
    Rcv(u32),
}

#[derive(Debug, Default)]
pub struct SandboxDsa {
    pub calls: Vec<DsaCall>,
    pub enabled: u32,
}

fn state(dm: &mut DriverModel, dev: DevId) -> Result<&mut SandboxDsa> {
    dm.priv_mut::<SandboxDsa>(dev).ok_or(ErrorKind::InvalidState)
}

pub fn calls(dm: &DriverModel, dev: DevId) -> &[DsaCall] {
    dm.priv_::<SandboxDsa>(dev).map_or(&[], |s| s.calls.as_slice())
}

/// Bitmap of enabled ports
pub fn enabled_ports(dm: &DriverModel, dev: DevId) -> u32 {
    dm.priv_::<SandboxDsa>(dev).map_or(0, |s| s.enabled)
}

/// Prefix `frame` with the tag routing it to `port`
pub fn tag(port: u32, frame: &[u8]) -> Vec<u8> {
    let mut tagged = Vec::with_capacity(frame.len() + TAG_LEN as usize);
    tagged.push(TAG_MAGIC);
    tagged.push(port as u8);
    tagged.extend_from_slice(frame);
    tagged
}

fn probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    dsa::set_tagging(dm, dev, TAG_LEN, 0)
}

fn port_probe(dm: &mut DriverModel, dev: DevId, port: u32, phy: &Phy) -> Result<()> {
    state(dm, dev)?.calls.push(DsaCall::PortProbe {
        port,
        phy: phy.kind,
    });
    Ok(())
}

fn port_enable(dm: &mut DriverModel, dev: DevId, port: u32, _phy: &Phy) -> Result<()> {
    let s = state(dm, dev)?;
    s.enabled |= 1 << port;
    s.calls.push(DsaCall::PortEnable(port));
    Ok(())
}

fn port_disable(dm: &mut DriverModel, dev: DevId, port: u32, _phy: &Phy) -> Result<()> {
    let s = state(dm, dev)?;
    s.enabled &= !(1 << port);
    s.calls.push(DsaCall::PortDisable(port));
    Ok(())
}

fn xmit(dm: &mut DriverModel, dev: DevId, port: u32, frame: &mut [u8]) -> Result<()> {
    if frame.len() < TAG_LEN as usize {
        return Err(ErrorKind::InvalidArgument);
    }
    frame[0] = TAG_MAGIC;
    frame[1] = port as u8;
    state(dm, dev)?.calls.push(DsaCall::Xmit(port));
    Ok(())
}

fn rcv(dm: &mut DriverModel, dev: DevId, frame: &[u8]) -> Result<u32> {
    match frame {
        [TAG_MAGIC, port, ..] => {
            let port = u32::from(*port);
            state(dm, dev)?.calls.push(DsaCall::Rcv(port));
            Ok(port)
        }
        _ => Err(ErrorKind::InvalidArgument),
    }
}

static SANDBOX_OPS: DsaOps = DsaOps {
    port_probe: Some(port_probe),
    port_enable: Some(port_enable),
    port_disable: Some(port_disable),
    xmit: Some(xmit),
    rcv: Some(rcv),
};

pub static SANDBOX_DSA_DRIVER: Driver = Driver {
    name: "dsa_sandbox",
    id: ClassId::Dsa,
    of_match: &[DeviceId::new("sandbox,dsa")],
    probe: Some(probe),
    priv_auto: Some(auto::<SandboxDsa>),
    ops: Ops::new(&SANDBOX_OPS),
    ..Driver::new()
};
