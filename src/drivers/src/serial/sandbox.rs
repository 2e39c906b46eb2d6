//! Sandbox UART backed by in-memory buffers
//!
//! `sandbox,busy = <n>` makes the first `n` writes report a full FIFO.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use device::{auto, ClassId, DevId, DeviceId, Driver, DriverModel, ErrorKind, Ops, Result};

use super::{SerialConfig, SerialDeviceInfo, SerialKind, SerialOps};

/// Bytes taken by one bulk write
const FIFO_LEN: usize = 4;

#[derive(Debug, Default)]
pub struct SandboxSerial {
    pub output: Vec<u8>,
    pub baudrate: u32,
    pub config: SerialConfig,
    input: VecDeque<u8>,
    busy: u32,
}

fn state(dm: &mut DriverModel, dev: DevId) -> Result<&mut SandboxSerial> {
    dm.priv_mut::<SandboxSerial>(dev)
        .ok_or(ErrorKind::InvalidState)
}

/// Everything written so far
pub fn output(dm: &DriverModel, dev: DevId) -> &[u8] {
    dm.priv_::<SandboxSerial>(dev)
        .map_or(&[], |s| s.output.as_slice())
}

/// Queue bytes for `getc`
pub fn feed(dm: &mut DriverModel, dev: DevId, input: &[u8]) -> Result<()> {
    state(dm, dev)?.input.extend(input);
    Ok(())
}

fn probe(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    let busy = dm
        .ofnode(dev)
        .map_or(0, |n| n.read_u32_default("sandbox,busy", 0));
    state(dm, dev)?.busy = busy;
    Ok(())
}

/// Consume one unit of simulated backpressure
fn stall(s: &mut SandboxSerial) -> bool {
    if s.busy > 0 {
        s.busy -= 1;
        return true;
    }
    false
}

fn putc(dm: &mut DriverModel, dev: DevId, c: u8) -> Result<()> {
    let s = state(dm, dev)?;
    if stall(s) {
        return Err(ErrorKind::TryAgain);
    }
    s.output.push(c);
    Ok(())
}

fn puts(dm: &mut DriverModel, dev: DevId, buf: &[u8]) -> Result<usize> {
    let s = state(dm, dev)?;
    if stall(s) {
        return Err(ErrorKind::TryAgain);
    }
    let n = buf.len().min(FIFO_LEN);
    s.output.extend_from_slice(&buf[..n]);
    Ok(n)
}

fn getc(dm: &mut DriverModel, dev: DevId) -> Result<u8> {
    state(dm, dev)?.input.pop_front().ok_or(ErrorKind::TryAgain)
}

fn pending(dm: &mut DriverModel, dev: DevId, input: bool) -> Result<usize> {
    let s = state(dm, dev)?;
    Ok(if input { s.input.len() } else { 0 })
}

fn clear(dm: &mut DriverModel, dev: DevId) -> Result<()> {
    state(dm, dev)?.input.clear();
    Ok(())
}

fn setbrg(dm: &mut DriverModel, dev: DevId, baudrate: u32) -> Result<()> {
    state(dm, dev)?.baudrate = baudrate;
    Ok(())
}

fn getconfig(dm: &mut DriverModel, dev: DevId) -> Result<SerialConfig> {
    Ok(state(dm, dev)?.config)
}

fn setconfig(dm: &mut DriverModel, dev: DevId, config: SerialConfig) -> Result<()> {
    if !(5..=8).contains(&config.data_bits) || !(1..=2).contains(&config.stop_bits) {
        return Err(ErrorKind::InvalidArgument);
    }
    state(dm, dev)?.config = config;
    Ok(())
}

fn getinfo(dm: &mut DriverModel, dev: DevId) -> Result<SerialDeviceInfo> {
    Ok(SerialDeviceInfo {
        kind: SerialKind::Sandbox,
        baudrate: state(dm, dev)?.baudrate,
        ..SerialDeviceInfo::default()
    })
}

/// Character-at-a-time port
const SANDBOX_OPS: SerialOps = SerialOps {
    setbrg: Some(setbrg),
    getc: Some(getc),
    putc: Some(putc),
    pending: Some(pending),
    clear: Some(clear),
    getconfig: Some(getconfig),
    setconfig: Some(setconfig),
    getinfo: Some(getinfo),
    ..SerialOps::new()
};

static SANDBOX_FIFO_OPS: SerialOps = SerialOps {
    puts: Some(puts),
    ..SANDBOX_OPS
};

pub static SANDBOX_SERIAL_DRIVER: Driver = Driver {
    name: "sandbox_serial",
    id: ClassId::Serial,
    of_match: &[DeviceId::new("sandbox,serial")],
    probe: Some(probe),
    priv_auto: Some(auto::<SandboxSerial>),
    ops: Ops::new(&SANDBOX_FIFO_OPS),
    ..Driver::new()
};

pub static SANDBOX_SERIAL_CHAR_DRIVER: Driver = Driver {
    name: "sandbox_serial_char",
    id: ClassId::Serial,
    of_match: &[DeviceId::new("sandbox,serial-char")],
    probe: Some(probe),
    priv_auto: Some(auto::<SandboxSerial>),
    ops: Ops::new(&SANDBOX_OPS),
    ..Driver::new()
};
