//! Sandbox ethernet controller with an in-memory wire

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use device::{auto, ClassId, DevId, DeviceId, Driver, DriverModel, ErrorKind, Ops, Result};

use super::eth::{self, EthOps, ARP_HLEN};

#[derive(Debug, Default)]
pub struct SandboxEth {
    pub started: bool,
    pub hwaddr: Option<[u8; ARP_HLEN]>,
    pub sent: Vec<Vec<u8>>,
    pub freed: usize,
    rx: VecDeque<Vec<u8>>,
}

fn state(dm: &mut DriverModel, dev: DevId) -> Result<&mut SandboxEth> {
    dm.priv_mut::<SandboxEth>(dev).ok_or(ErrorKind::InvalidState)
}

/// Frames sent so far, oldest first
pub fn sent(dm: &DriverModel, dev: DevId) -> &[Vec<u8>] {
    dm.priv_::<SandboxEth>(dev).map_or(&[], |s| s.sent.as_slice())
}

/// Queue a frame for the next `recv`
pub fn inject(dm: &mut DriverModel, dev: DevId, frame: &[u8]) -> Result<()> {
    state(dm, dev)?.rx.push_back(frame.to_vec());
    Ok(())
}

fn probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    if dm.ofnode(dev).is_some_and(|n| n.read_bool("sandbox,fail-probe")) {
        return Err(ErrorKind::HardwareTimeout);
    }
    Ok(())
}

fn start(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    state(dm, dev)?.started = true;
    Ok(())
}

fn stop(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    state(dm, dev)?.started = false;
    Ok(())
}

fn send(dm: &mut DriverModel, dev: DevId, packet: &[u8]) -> Result<()> {
    let s = state(dm, dev)?;
    if !s.started {
        return Err(ErrorKind::InvalidState);
    }
    s.sent.push(packet.to_vec());
    Ok(())
}

fn recv(dm: &mut DriverModel, dev: DevId) -> Result<Vec<u8>> {
    state(dm, dev)?.rx.pop_front().ok_or(ErrorKind::TryAgain)
}

fn free_pkt(dm: &mut DriverModel, dev: DevId, _len: usize) -> Result<()> {
    state(dm, dev)?.freed += 1;
    Ok(())
}

fn write_hwaddr(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let mac = eth::enetaddr(dm, dev).ok_or(ErrorKind::InvalidState)?;
    state(dm, dev)?.hwaddr = Some(mac);
    Ok(())
}

static SANDBOX_OPS: EthOps = EthOps {
    start: Some(start),
    send: Some(send),
    recv: Some(recv),
    free_pkt: Some(free_pkt),
    stop: Some(stop),
    write_hwaddr: Some(write_hwaddr),
};

pub static SANDBOX_ETH_DRIVER: Driver = Driver {
    name: "eth_sandbox",
    id: ClassId::Eth,
    of_match: &[DeviceId::new("sandbox,eth")],
    probe: Some(probe),
    priv_auto: Some(auto::<SandboxEth>),
    ops: Ops::new(&SANDBOX_OPS),
    ..Driver::new()
};
