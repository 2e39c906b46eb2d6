/// Busy-wait used for hardware settling times
///
/// The driver model never sleeps; a delay is a bounded spin. Boards with a
/// calibrated timer, and tests that want to observe delays, install their own
/// implementation with [`crate::DriverModel::set_delay`].
pub trait Delay {
    fn udelay(&self, us: u32);
}

impl<F: Fn(u32)> Delay for F {
    fn udelay(&self, us: u32) {
        self(us)
    }
}

/// Uncalibrated spin loop
pub struct SpinDelay;

impl SpinDelay {
    const LOOPS_PER_US: u32 = 100;
}

impl Delay for SpinDelay {
    fn udelay(&self, us: u32) {
        for _ in 0..us.saturating_mul(Self::LOOPS_PER_US) {
            core::hint::spin_loop();
        }
    }
}
