//! Distributed switch architecture
//!
//! A switch sits behind a host ethernet controller, the master, attached to
//! one of its ports, the CPU port. Every other port of the switch becomes an
//! ethernet device of its own, a child of the switch bound to the generic
//! `dsa-port` driver. Frames sent through a port go out via the master,
//! tagged by the switch driver so the switch knows the egress port.

use alloc::vec;
use alloc::vec::Vec;

use device::{
    auto, invoke, ClassDriver, ClassId, ClassOps, DevId, Driver, DriverModel, ErrorKind, Ops,
    Result,
};
use log::{debug, error, warn};
use oreboot_fdt::{NodeId, Ofnode};

use super::eth::{self, EthOps, EthPlat};

pub const DSA_MAX_PORTS: u32 = 32;
/// Largest headroom plus tailroom a tagging protocol may ask for
pub const DSA_MAX_OVERHEAD: u32 = 256;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PhyKind {
    /// Fixed link, no PHY to talk to
    Fixed,
    /// PHY referenced through `phy-handle`
    External(NodeId),
    /// PHY integrated in the switch, addressed by port index
    Internal,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Phy {
    pub kind: PhyKind,
    pub addr: u32,
    pub speed: u32,
    pub full_duplex: bool,
}

impl Phy {
    /// Link described by a `fixed-link` subnode, if the port has one
    pub fn fixed_link(port: &Ofnode) -> Option<Self> {
        let link = port.subnode("fixed-link")?;
        Some(Self {
            kind: PhyKind::Fixed,
            addr: 0,
            speed: link.read_u32_default("speed", 10),
            full_duplex: link.read_bool("full-duplex"),
        })
    }

    /// Fixed link, else the `phy-handle` target, else the internal PHY at
    /// the port's own address
    pub fn for_port(port: &Ofnode, index: u32) -> Self {
        if let Some(phy) = Self::fixed_link(port) {
            return phy;
        }
        match port.read_phandle("phy-handle") {
            Some(target) => Self {
                kind: PhyKind::External(target.id()),
                addr: target.read_u32_default("reg", 0),
                speed: 1000,
                full_duplex: true,
            },
            None => Self {
                kind: PhyKind::Internal,
                addr: index,
                speed: 1000,
                full_duplex: true,
            },
        }
    }
}

/// Switch layout, filled in at bind time
#[derive(Debug, Default)]
pub struct DsaPlat {
    pub master_node: Option<NodeId>,
    pub cpu_port_node: Option<NodeId>,
    pub num_ports: u32,
    pub cpu_port: u32,
}

/// Switch state while active
#[derive(Debug, Default)]
pub struct DsaPriv {
    pub master: Option<DevId>,
    pub cpu_port_phy: Option<Phy>,
    pub headroom: u32,
    pub tailroom: u32,
}

/// What the switch keeps about each of its port devices
#[derive(Debug, Default)]
pub struct DsaPortPlat {
    pub index: u32,
    pub phy: Option<Phy>,
}

/// Switch operations, all keyed by port index
///
/// `xmit` gets the frame with the tagging headroom and tailroom already
/// reserved and fills in the tag. `rcv` reads the tag of a received frame
/// and names the port it came in on.
pub struct DsaOps {
    pub port_probe: Option<fn(&mut DriverModel, DevId, u32, &Phy) -> Result<()>>,
    pub port_enable: Option<fn(&mut DriverModel, DevId, u32, &Phy) -> Result<()>>,
    pub port_disable: Option<fn(&mut DriverModel, DevId, u32, &Phy) -> Result<()>>,
    pub xmit: Option<fn(&mut DriverModel, DevId, u32, &mut [u8]) -> Result<()>>,
    pub rcv: Option<fn(&mut DriverModel, DevId, &[u8]) -> Result<u32>>,
}

impl DsaOps {
    pub const fn new() -> Self {
        Self {
            port_probe: None,
            port_enable: None,
            port_disable: None,
            xmit: None,
            rcv: None,
        }
    }
}

impl ClassOps for DsaOps {
    const CLASS: ClassId = ClassId::Dsa;
}

fn optional(result: Result<()>) -> Result<()> {
    match result {
        Err(ErrorKind::NotImplemented) => Ok(()),
        other => other,
    }
}

pub fn get_master(dm: &DriverModel, dev: DevId) -> Option<DevId> {
    dm.uclass_priv::<DsaPriv>(dev)?.master
}

pub fn cpu_port(dm: &DriverModel, dev: DevId) -> Option<u32> {
    dm.uclass_plat::<DsaPlat>(dev).map(|p| p.cpu_port)
}

pub fn cpu_port_phy(dm: &DriverModel, dev: DevId) -> Option<Phy> {
    dm.uclass_priv::<DsaPriv>(dev)?.cpu_port_phy
}

/// Reserve room for the switch tag around every frame sent through a port
pub fn set_tagging(dm: &mut DriverModel, dev: DevId, headroom: u32, tailroom: u32) -> Result<()> {
    headroom
        .checked_add(tailroom)
        .filter(|n| *n <= DSA_MAX_OVERHEAD)
        .ok_or(ErrorKind::InvalidArgument)?;
    let p = dm
        .uclass_priv_mut::<DsaPriv>(dev)
        .ok_or(ErrorKind::InvalidState)?;
    p.headroom = headroom;
    p.tailroom = tailroom;
    Ok(())
}

fn dsa_post_bind(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let node = dm.ofnode(dev).ok_or(ErrorKind::InvalidConfig)?;
    let Some(ports) = node
        .subnode("ports")
        .or_else(|| node.subnode("ethernet-ports"))
    else {
        error!("{}: no ports node", dm.name(dev));
        return Err(ErrorKind::InvalidConfig);
    };

    let num_ports = ports.child_count() as u32;
    if num_ports == 0 || num_ports > DSA_MAX_PORTS {
        error!("{}: unsupported number of ports: {}", dm.name(dev), num_ports);
        return Err(ErrorKind::InvalidConfig);
    }
    let Some(cpu) = ports.children().find(|p| p.read_bool("ethernet")) else {
        error!("{}: no port references a master", dm.name(dev));
        return Err(ErrorKind::InvalidConfig);
    };
    let master = cpu.read_phandle("ethernet").ok_or(ErrorKind::InvalidConfig)?;
    let cpu_port = cpu.read_u32("reg").ok_or(ErrorKind::InvalidConfig)?;

    let plat = dm
        .uclass_plat_mut::<DsaPlat>(dev)
        .ok_or(ErrorKind::InvalidState)?;
    plat.master_node = Some(master.id());
    plat.cpu_port_node = Some(cpu.id());
    plat.num_ports = num_ports;
    plat.cpu_port = cpu_port;
    debug!(
        "{}: {} ports, CPU port {} on {}",
        dm.name(dev),
        num_ports,
        cpu_port,
        master.path()
    );

    let user_ports: Vec<Ofnode> = ports
        .children()
        .filter(|p| p.id() != cpu.id())
        .filter(|p| match p.read_u32("reg") {
            Some(index) if index >= num_ports => {
                warn!("{}: port index {} out of range", dm.name(dev), index);
                false
            }
            _ => true,
        })
        .collect();
    let binding = dm.bind_subnodes(dev, user_ports, &DSA_PORT_DRIVER, |dm, port, index| {
        dm.parent_plat_mut::<DsaPortPlat>(port)
            .ok_or(ErrorKind::InvalidState)?
            .index = index;
        Ok(())
    });
    for (node, e) in &binding.errors {
        warn!(
            "{}: port {} not bound: {}",
            dm.name(dev),
            dm.tree().path(*node),
            e
        );
    }
    match binding.first_error() {
        Some(e) if binding.bound.is_empty() => Err(e),
        _ => Ok(()),
    }
}

fn dsa_pre_probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let plat = dm
        .uclass_plat::<DsaPlat>(dev)
        .ok_or(ErrorKind::InvalidState)?;
    let master_node = plat.master_node.ok_or(ErrorKind::InvalidConfig)?;
    let cpu_node = plat.cpu_port_node.ok_or(ErrorKind::InvalidConfig)?;

    let cpu = Ofnode::new(dm.tree().clone(), cpu_node);
    let Some(phy) = Phy::fixed_link(&cpu) else {
        error!("{}: CPU port has no fixed-link", dm.name(dev));
        return Err(ErrorKind::InvalidConfig);
    };
    let master = dm
        .uclass_get_device_by_ofnode(ClassId::Eth, master_node)
        .map_err(|e| {
            error!("{}: master unavailable: {}", dm.name(dev), e);
            e
        })?;

    let p = dm
        .uclass_priv_mut::<DsaPriv>(dev)
        .ok_or(ErrorKind::InvalidState)?;
    p.master = Some(master);
    p.cpu_port_phy = Some(phy);
    Ok(())
}

fn cpu_info(dm: &DriverModel, dev: DevId) -> Result<(u32, Phy)> {
    let port = cpu_port(dm, dev).ok_or(ErrorKind::InvalidState)?;
    let phy = cpu_port_phy(dm, dev).ok_or(ErrorKind::InvalidState)?;
    Ok((port, phy))
}

fn dsa_post_probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let (port, phy) = cpu_info(dm, dev)?;
    optional(invoke!(dm, dev, DsaOps, port_probe, port, &phy))
}

pub static DSA_CLASS: ClassDriver = ClassDriver {
    name: "dsa",
    id: ClassId::Dsa,
    post_bind: Some(dsa_post_bind),
    pre_probe: Some(dsa_pre_probe),
    post_probe: Some(dsa_post_probe),
    per_device_auto: Some(auto::<DsaPriv>),
    per_device_plat_auto: Some(auto::<DsaPlat>),
    per_child_plat_auto: Some(auto::<DsaPortPlat>),
    ..ClassDriver::new()
};

/// Switch, port index and PHY of a port device
fn port_info(dm: &DriverModel, port: DevId) -> Result<(DevId, u32, Phy)> {
    let switch = dm
        .device(port)
        .and_then(|d| d.parent())
        .ok_or(ErrorKind::InvalidState)?;
    let plat = dm
        .parent_plat::<DsaPortPlat>(port)
        .ok_or(ErrorKind::InvalidState)?;
    let phy = plat.phy.ok_or(ErrorKind::InvalidState)?;
    Ok((switch, plat.index, phy))
}

fn master_of(dm: &DriverModel, switch: DevId) -> Result<DevId> {
    get_master(dm, switch).ok_or(ErrorKind::NotFound)
}

fn dsa_port_probe(dm: &mut DriverModel, port: DevId) -> Result<()> {
    let switch = dm
        .device(port)
        .and_then(|d| d.parent())
        .ok_or(ErrorKind::InvalidState)?;
    let node = dm.ofnode(port).ok_or(ErrorKind::InvalidConfig)?;
    let plat = dm
        .parent_plat_mut::<DsaPortPlat>(port)
        .ok_or(ErrorKind::InvalidState)?;
    let index = plat.index;
    let phy = Phy::for_port(&node, index);
    plat.phy = Some(phy);

    let master = master_of(dm, switch)?;
    dm.probe(master)?;

    // Ports without their own address share the master's
    let master_mac = eth::enetaddr(dm, master).ok_or(ErrorKind::InvalidState)?;
    let eth_plat = dm
        .uclass_plat_mut::<EthPlat>(port)
        .ok_or(ErrorKind::InvalidState)?;
    if !eth::is_valid_ethaddr(&eth_plat.enetaddr) {
        eth_plat.enetaddr = master_mac;
    }

    optional(invoke!(dm, switch, DsaOps, port_probe, index, &phy))
}

fn dsa_port_start(dm: &mut DriverModel, port: DevId) -> Result<()> {
    let (switch, index, phy) = port_info(dm, port)?;
    let (cpu, cpu_phy) = cpu_info(dm, switch)?;
    optional(invoke!(dm, switch, DsaOps, port_enable, index, &phy))?;
    optional(invoke!(dm, switch, DsaOps, port_enable, cpu, &cpu_phy))?;
    let master = master_of(dm, switch)?;
    eth::start(dm, master)
}

fn dsa_port_stop(dm: &mut DriverModel, port: DevId) -> Result<()> {
    let (switch, index, phy) = port_info(dm, port)?;
    let (cpu, cpu_phy) = cpu_info(dm, switch)?;
    optional(invoke!(dm, switch, DsaOps, port_disable, index, &phy))?;
    optional(invoke!(dm, switch, DsaOps, port_disable, cpu, &cpu_phy))?;
    let master = master_of(dm, switch)?;
    eth::stop(dm, master)
}

fn tagging(dm: &DriverModel, switch: DevId) -> Result<(usize, usize)> {
    let p = dm
        .uclass_priv::<DsaPriv>(switch)
        .ok_or(ErrorKind::InvalidState)?;
    Ok((p.headroom as usize, p.tailroom as usize))
}

fn dsa_port_send(dm: &mut DriverModel, port: DevId, packet: &[u8]) -> Result<()> {
    let (switch, index, _) = port_info(dm, port)?;
    let (head, tail) = tagging(dm, switch)?;

    let mut frame = vec![0; head + packet.len() + tail];
    frame[head..head + packet.len()].copy_from_slice(packet);
    optional(invoke!(dm, switch, DsaOps, xmit, index, frame.as_mut_slice()))?;

    let master = master_of(dm, switch)?;
    eth::send(dm, master, &frame)
}

/// Receive through the master, keeping only frames tagged for this port
fn dsa_port_recv(dm: &mut DriverModel, port: DevId) -> Result<Vec<u8>> {
    let (switch, index, _) = port_info(dm, port)?;
    let (head, tail) = tagging(dm, switch)?;
    let master = master_of(dm, switch)?;

    let frame = eth::recv(dm, master)?;
    let source = match invoke!(dm, switch, DsaOps, rcv, frame.as_slice()) {
        Ok(source) => source,
        Err(ErrorKind::NotImplemented) => index,
        Err(e) => return Err(e),
    };
    if source != index {
        debug!("{}: dropping frame for port {}", dm.name(port), source);
        return Err(ErrorKind::TryAgain);
    }
    if frame.len() < head + tail {
        return Err(ErrorKind::InvalidArgument);
    }
    Ok(frame[head..frame.len() - tail].to_vec())
}

static DSA_PORT_OPS: EthOps = EthOps {
    start: Some(dsa_port_start),
    send: Some(dsa_port_send),
    recv: Some(dsa_port_recv),
    stop: Some(dsa_port_stop),
    ..EthOps::new()
};

/// Ethernet device standing for one user port of a switch
pub static DSA_PORT_DRIVER: Driver = Driver {
    name: "dsa-port",
    id: ClassId::Eth,
    probe: Some(dsa_port_probe),
    ops: Ops::new(&DSA_PORT_OPS),
    ..Driver::new()
};
