//! Serial uclass
//!
//! Drivers report `TryAgain` while the hardware cannot take or give a
//! character; the helpers here poll until it can, up to a limit.

use device::{
    auto, invoke, ClassDriver, ClassFlags, ClassId, ClassOps, DevId, DriverModel, ErrorKind,
    Result,
};
use log::{debug, warn};

#[cfg(feature = "sandbox")]
pub mod sandbox;

pub const DEFAULT_BAUDRATE: u32 = 115_200;
/// Polls of a busy port before giving up on it
pub const MAX_RETRIES: u32 = 1_000_000;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SerialConfig {
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl Default for SerialConfig {
    /// 8N1
    fn default() -> Self {
        Self {
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SerialKind {
    #[default]
    Unknown,
    Ns16550,
    Pl011,
    Sandbox,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SerialDeviceInfo {
    pub kind: SerialKind,
    pub addr: u64,
    pub size: u64,
    pub baudrate: u32,
    pub reg_width: u32,
    pub reg_shift: u32,
}

#[derive(Debug, Default)]
pub struct SerialUcPriv {
    pub baudrate: u32,
}

pub struct SerialOps {
    pub setbrg: Option<fn(&mut DriverModel, DevId, u32) -> Result<()>>,
    pub getc: Option<fn(&mut DriverModel, DevId) -> Result<u8>>,
    pub putc: Option<fn(&mut DriverModel, DevId, u8) -> Result<()>>,
    /// Write a prefix of the buffer, returning how much was taken
    pub puts: Option<fn(&mut DriverModel, DevId, &[u8]) -> Result<usize>>,
    /// Characters waiting in the input (`true`) or output FIFO
    pub pending: Option<fn(&mut DriverModel, DevId, bool) -> Result<usize>>,
    pub clear: Option<fn(&mut DriverModel, DevId) -> Result<()>>,
    pub getconfig: Option<fn(&mut DriverModel, DevId) -> Result<SerialConfig>>,
    pub setconfig: Option<fn(&mut DriverModel, DevId, SerialConfig) -> Result<()>>,
    pub getinfo: Option<fn(&mut DriverModel, DevId) -> Result<SerialDeviceInfo>>,
}

impl SerialOps {
    pub const fn new() -> Self {
        Self {
            setbrg: None,
            getc: None,
            putc: None,
            puts: None,
            pending: None,
            clear: None,
            getconfig: None,
            setconfig: None,
            getinfo: None,
        }
    }
}

impl ClassOps for SerialOps {
    const CLASS: ClassId = ClassId::Serial;
}

fn put_raw(dm: &mut DriverModel, dev: DevId, c: u8) -> Result<()> {
    for _ in 0..MAX_RETRIES {
        match invoke!(dm, dev, SerialOps, putc, c) {
            Err(ErrorKind::TryAgain) => continue,
            other => return other,
        }
    }
    Err(ErrorKind::HardwareTimeout)
}

/// Write one character, sending `\n` as `\r\n`
pub fn putc(dm: &mut DriverModel, dev: DevId, c: u8) -> Result<()> {
    if c == b'\n' {
        put_raw(dm, dev, b'\r')?;
    }
    put_raw(dm, dev, c)
}

fn write_all(dm: &mut DriverModel, dev: DevId, mut buf: &[u8]) -> Result<()> {
    let mut stalls = 0;
    while !buf.is_empty() {
        match invoke!(dm, dev, SerialOps, puts, buf) {
            Ok(n) if n > 0 => {
                buf = &buf[n.min(buf.len())..];
                stalls = 0;
            }
            Ok(_) | Err(ErrorKind::TryAgain) => {
                stalls += 1;
                if stalls >= MAX_RETRIES {
                    return Err(ErrorKind::HardwareTimeout);
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Write a string, using the driver's bulk write when it has one
pub fn puts(dm: &mut DriverModel, dev: DevId, s: &[u8]) -> Result<()> {
    if dm.capability::<SerialOps, _>(dev, |o| o.puts).is_err() {
        return s.iter().try_for_each(|c| putc(dm, dev, *c));
    }
    for (i, line) in s.split(|c| *c == b'\n').enumerate() {
        if i > 0 {
            write_all(dm, dev, b"\r\n")?;
        }
        write_all(dm, dev, line)?;
    }
    Ok(())
}

/// Wait for one character
pub fn getc(dm: &mut DriverModel, dev: DevId) -> Result<u8> {
    for _ in 0..MAX_RETRIES {
        match invoke!(dm, dev, SerialOps, getc) {
            Err(ErrorKind::TryAgain) => continue,
            other => return other,
        }
    }
    Err(ErrorKind::HardwareTimeout)
}

/// Whether input is waiting; ports that cannot tell always say yes
pub fn tstc(dm: &mut DriverModel, dev: DevId) -> Result<bool> {
    match invoke!(dm, dev, SerialOps, pending, true) {
        Ok(n) => Ok(n > 0),
        Err(ErrorKind::NotImplemented) => Ok(true),
        Err(e) => Err(e),
    }
}

pub fn setbrg(dm: &mut DriverModel, dev: DevId, baudrate: u32) -> Result<()> {
    invoke!(dm, dev, SerialOps, setbrg, baudrate)?;
    if let Some(p) = dm.uclass_priv_mut::<SerialUcPriv>(dev) {
        p.baudrate = baudrate;
    }
    Ok(())
}

pub fn baudrate(dm: &DriverModel, dev: DevId) -> Option<u32> {
    dm.uclass_priv::<SerialUcPriv>(dev).map(|p| p.baudrate)
}

pub fn clear(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    match invoke!(dm, dev, SerialOps, clear) {
        Err(ErrorKind::NotImplemented) => Ok(()),
        other => other,
    }
}

/// Line settings; ports without the operation run 8N1
pub fn getconfig(dm: &mut DriverModel, dev: DevId) -> Result<SerialConfig> {
    match invoke!(dm, dev, SerialOps, getconfig) {
        Err(ErrorKind::NotImplemented) => Ok(SerialConfig::default()),
        other => other,
    }
}

pub fn setconfig(dm: &mut DriverModel, dev: DevId, config: SerialConfig) -> Result<()> {
    match invoke!(dm, dev, SerialOps, setconfig, config) {
        Err(ErrorKind::NotImplemented) if config == SerialConfig::default() => Ok(()),
        other => other,
    }
}

pub fn getinfo(dm: &mut DriverModel, dev: DevId) -> Result<SerialDeviceInfo> {
    let mut info = invoke!(dm, dev, SerialOps, getinfo)?;
    if info.baudrate == 0 {
        info.baudrate = baudrate(dm, dev).unwrap_or(DEFAULT_BAUDRATE);
    }
    Ok(info)
}

/// Pick and probe the console: `/chosen/stdout-path`, then sequence 0,
/// then whichever serial device comes first
pub fn find_console(dm: &mut DriverModel) -> Result<DevId> {
    if let Some(node) = dm.tree().chosen_stdout() {
        match dm.uclass_get_device_by_ofnode(ClassId::Serial, node) {
            Ok(dev) => return Ok(dev),
            Err(e) => warn!("serial: stdout-path device unusable: {}", e),
        }
    }
    dm.uclass_get_device_by_seq(ClassId::Serial, 0)
        .or_else(|_| dm.uclass_get_device(ClassId::Serial, 0))
}

fn serial_post_probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let baudrate = dm
        .ofnode(dev)
        .map_or(DEFAULT_BAUDRATE, |n| n.read_u32_default("current-speed", DEFAULT_BAUDRATE));
    match setbrg(dm, dev, baudrate) {
        Ok(()) => Ok(()),
        Err(ErrorKind::NotImplemented) => {
            debug!("{}: fixed baud rate", dm.name(dev));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

pub static SERIAL_CLASS: ClassDriver = ClassDriver {
    name: "serial",
    id: ClassId::Serial,
    post_probe: Some(serial_post_probe),
    per_device_auto: Some(auto::<SerialUcPriv>),
    flags: ClassFlags::SEQ_ALIAS,
    ..ClassDriver::new()
};
