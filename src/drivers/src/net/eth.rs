//! Ethernet uclass
//!
//! Drivers move whole frames; the uclass keeps the MAC address and whether
//! the interface is running.

use alloc::vec::Vec;
use device::{
    auto, invoke, ClassDriver, ClassFlags, ClassId, ClassOps, DevId, DriverModel, ErrorKind,
    Result,
};
use log::{debug, warn};

pub const ARP_HLEN: usize = 6;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EthPlat {
    pub enetaddr: [u8; ARP_HLEN],
    pub max_speed: u32,
}

#[derive(Debug, Default)]
pub struct EthUcPriv {
    pub running: bool,
}

/// Ethernet operations
///
/// `recv` reports `TryAgain` when no frame is waiting.
pub struct EthOps {
    pub start: Option<fn(&mut DriverModel, DevId) -> Result<()>>,
    pub send: Option<fn(&mut DriverModel, DevId, &[u8]) -> Result<()>>,
    pub recv: Option<fn(&mut DriverModel, DevId) -> Result<Vec<u8>>>,
    pub free_pkt: Option<fn(&mut DriverModel, DevId, usize) -> Result<()>>,
    pub stop: Option<fn(&mut DriverModel, DevId) -> Result<()>>,
    pub write_hwaddr: Option<fn(&mut DriverModel, DevId) -> Result<()>>,
}

impl EthOps {
    pub const fn new() -> Self {
        Self {
            start: None,
            send: None,
            recv: None,
            free_pkt: None,
            stop: None,
            write_hwaddr: None,
        }
    }
}

impl ClassOps for EthOps {
    const CLASS: ClassId = ClassId::Eth;
}

/// Unicast and not all zeroes
pub fn is_valid_ethaddr(addr: &[u8; ARP_HLEN]) -> bool {
    addr[0] & 1 == 0 && addr.iter().any(|b| *b != 0)
}

pub fn enetaddr(dm: &DriverModel, dev: DevId) -> Option<[u8; ARP_HLEN]> {
    dm.uclass_plat::<EthPlat>(dev).map(|p| p.enetaddr)
}

pub fn is_running(dm: &DriverModel, dev: DevId) -> bool {
    dm.uclass_priv::<EthUcPriv>(dev).is_some_and(|p| p.running)
}

fn set_running(dm: &mut DriverModel, dev: DevId, running: bool) -> Result<()> {
    dm.uclass_priv_mut::<EthUcPriv>(dev)
        .ok_or(ErrorKind::InvalidState)?
        .running = running;
    Ok(())
}

/// Probe the interface if needed and bring it up
pub fn start(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    dm.probe(dev)?;
    if is_running(dm, dev) {
        return Ok(());
    }
    invoke!(dm, dev, EthOps, start)?;
    set_running(dm, dev, true)
}

pub fn stop(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    if !is_running(dm, dev) {
        return Ok(());
    }
    match invoke!(dm, dev, EthOps, stop) {
        Ok(()) | Err(ErrorKind::NotImplemented) => set_running(dm, dev, false),
        Err(e) => Err(e),
    }
}

pub fn send(dm: &mut DriverModel, dev: DevId, packet: &[u8]) -> Result<()> {
    if !is_running(dm, dev) {
        return Err(ErrorKind::InvalidState);
    }
    invoke!(dm, dev, EthOps, send, packet)
}

/// Take one received frame, handing the driver's buffer back afterwards
pub fn recv(dm: &mut DriverModel, dev: DevId) -> Result<Vec<u8>> {
    if !is_running(dm, dev) {
        return Err(ErrorKind::InvalidState);
    }
    let packet = invoke!(dm, dev, EthOps, recv)?;
    match invoke!(dm, dev, EthOps, free_pkt, packet.len()) {
        Ok(()) | Err(ErrorKind::NotImplemented) => Ok(packet),
        Err(e) => Err(e),
    }
}

fn eth_pre_probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let Some(node) = dm.ofnode(dev) else {
        return Ok(());
    };
    let mac = ["local-mac-address", "mac-address"].iter().find_map(|name| {
        let prop = node.property(name)?;
        <[u8; ARP_HLEN]>::try_from(prop.value()).ok()
    });

    let plat = dm
        .uclass_plat_mut::<EthPlat>(dev)
        .ok_or(ErrorKind::InvalidState)?;
    if let Some(mac) = mac {
        plat.enetaddr = mac;
    }
    plat.max_speed = node.read_u32_default("max-speed", 0);
    Ok(())
}

fn eth_post_probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let Some(mac) = enetaddr(dm, dev) else {
        return Ok(());
    };
    if !is_valid_ethaddr(&mac) {
        debug!("{}: no valid MAC address", dm.name(dev));
        return Ok(());
    }
    match invoke!(dm, dev, EthOps, write_hwaddr) {
        Ok(()) | Err(ErrorKind::NotImplemented) => Ok(()),
        Err(e) => {
            warn!("{}: cannot program MAC address: {}", dm.name(dev), e);
            Err(e)
        }
    }
}

fn eth_pre_remove(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    stop(dm, dev)
}

pub static ETH_CLASS: ClassDriver = ClassDriver {
    name: "ethernet",
    id: ClassId::Eth,
    pre_probe: Some(eth_pre_probe),
    post_probe: Some(eth_post_probe),
    pre_remove: Some(eth_pre_remove),
    per_device_auto: Some(auto::<EthUcPriv>),
    per_device_plat_auto: Some(auto::<EthPlat>),
    flags: ClassFlags::SEQ_ALIAS,
    ..ClassDriver::new()
};
