//! Raw free-running counters.
//!
//! A [`RawCounter`] is the single hardware primitive the monotonic timer is
//! built on: a register that increments at a fixed rate and wraps from
//! [`RawCounter::max_value`] back to zero.

pub use bringup_common::config::max_for_bits;

use bringup_common::config::TimerConfig;
use bringup_common::error::{BringupError, BringupResult};
use std::cell::Cell;
use std::ptr;
use std::time::Instant;

/// A free-running counter that wraps at a fixed width.
pub trait RawCounter {
    /// Current counter value, always `<= max_value()`.
    fn read(&self) -> u64;

    /// Value after which the counter wraps to zero (`2^bits - 1`).
    fn max_value(&self) -> u64 {
        u64::from(u32::MAX)
    }
}

/// 32-bit memory-mapped counter register (e.g. a GP timer's TCRR).
#[derive(Debug)]
pub struct MmioCounter {
    reg: *const u32,
}

impl MmioCounter {
    /// Wrap the counter register at `address`.
    ///
    /// # Safety
    ///
    /// `address` must be a mapped, 4-byte aligned counter register that stays
    /// valid for the lifetime of this value, with the timer already started.
    pub unsafe fn new(address: usize) -> Self {
        Self {
            reg: address as *const u32,
        }
    }
}

impl RawCounter for MmioCounter {
    #[inline]
    fn read(&self) -> u64 {
        // SAFETY: validity of the register is the constructor's contract.
        u64::from(unsafe { ptr::read_volatile(self.reg) })
    }
}

/// Counter derived from the host monotonic clock, truncated to `bits` wide.
///
/// Lets the delay and wraparound logic run unchanged on a development host;
/// a narrow width makes wraps happen within milliseconds.
#[derive(Debug, Clone)]
pub struct HostCounter {
    origin: Instant,
    tick_rate_hz: u64,
    max: u64,
    offset: u64,
}

impl HostCounter {
    /// Create a counter ticking at `tick_rate_hz`, wrapping at `bits` wide.
    ///
    /// # Errors
    ///
    /// Returns [`BringupError::InvalidTimer`] for a zero rate or a width
    /// outside `1..=64`.
    pub fn new(tick_rate_hz: u64, bits: u8) -> BringupResult<Self> {
        if tick_rate_hz == 0 {
            return Err(BringupError::InvalidTimer("tick rate must be non-zero".into()));
        }
        Ok(Self {
            origin: Instant::now(),
            tick_rate_hz,
            max: max_for_bits(bits)?,
            offset: 0,
        })
    }

    /// Create a counter from the `[timer]` configuration section.
    ///
    /// # Errors
    ///
    /// Same as [`HostCounter::new`].
    pub fn from_config(config: &TimerConfig) -> BringupResult<Self> {
        Self::new(config.tick_rate_hz, config.counter_bits)
    }

    /// Start counting from `raw` instead of zero, e.g. just below the wrap.
    #[must_use]
    pub fn with_offset(mut self, raw: u64) -> Self {
        self.offset = raw & self.max;
        self
    }
}

impl RawCounter for HostCounter {
    fn read(&self) -> u64 {
        let ticks = self.origin.elapsed().as_nanos() * u128::from(self.tick_rate_hz)
            / 1_000_000_000;
        // Truncating to u64 keeps the low bits, which is all the mask keeps.
        #[allow(clippy::cast_possible_truncation)]
        let ticks = ticks as u64;
        ticks.wrapping_add(self.offset) & self.max
    }

    fn max_value(&self) -> u64 {
        self.max
    }
}

/// Deterministic counter for tests and simulations.
///
/// Every [`read`](RawCounter::read) returns the current value and then
/// advances it by `step`, so busy-wait loops make progress without a clock.
#[derive(Debug, Clone)]
pub struct SimulatedCounter {
    value: Cell<u64>,
    step: Cell<u64>,
    max: u64,
}

impl SimulatedCounter {
    /// A 32-bit counter starting at `start` that does not advance on reads.
    #[must_use]
    pub fn new(start: u64) -> Self {
        Self::with_max(start, u64::from(u32::MAX))
    }

    /// A counter wrapping after `max`, starting at `start`.
    #[must_use]
    pub fn with_max(start: u64, max: u64) -> Self {
        Self {
            value: Cell::new(start.min(max)),
            step: Cell::new(0),
            max,
        }
    }

    /// Advance by `step` ticks after every read.
    #[must_use]
    pub fn stepping(self, step: u64) -> Self {
        self.step.set(step);
        self
    }

    /// Change the per-read step.
    pub fn set_step(&self, step: u64) {
        self.step.set(step);
    }

    /// Jump to an absolute raw value.
    pub fn set(&self, raw: u64) {
        self.value.set(raw.min(self.max));
    }

    /// Advance by `ticks`, wrapping past the maximum.
    pub fn advance(&self, ticks: u64) {
        let modulus = u128::from(self.max) + 1;
        let next = (u128::from(self.value.get()) + u128::from(ticks)) % modulus;
        // next < modulus <= 2^64
        #[allow(clippy::cast_possible_truncation)]
        let next = next as u64;
        self.value.set(next);
    }

    /// Current raw value without advancing.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.value.get()
    }
}

impl RawCounter for SimulatedCounter {
    fn read(&self) -> u64 {
        let now = self.value.get();
        self.advance(self.step.get());
        now
    }

    fn max_value(&self) -> u64 {
        self.max
    }
}
