//! Wraparound-corrected monotonic tick count and busy-wait delays.
//!
//! [`MonotonicTimer`] owns the only two words of timer state: the last raw
//! counter sample and the ticks accumulated since the last reset. Every
//! time query goes through [`MonotonicTimer::elapsed_ticks`], which is the
//! single place raw-counter wraparound is corrected.
//!
//! `elapsed_ticks` must be called at least once per wrap period of the raw
//! counter; two wraps between samples are indistinguishable from none.
//!
//! The elapsed count saturates at `u64::MAX`, so it never decreases between
//! resets. [`MonotonicTimer::delay_us_masked`] runs on a separate free-running
//! count that wraps instead.

use crate::convert::ticks_for_us;
use crate::counter::RawCounter;
use bringup_common::config::TimerConfig;
use bringup_common::error::{BringupError, BringupResult};
use std::hint;
use tracing::{debug, trace, warn};

/// Monotonic elapsed-tick counter layered on a [`RawCounter`].
///
/// All mutating operations take `&mut self`, so the read-modify-write of the
/// timer state is exclusive by construction. Use
/// [`SharedTimer`](crate::SharedTimer) to share one timer between threads.
#[derive(Debug)]
pub struct MonotonicTimer<C: RawCounter> {
    counter: C,
    tick_rate_hz: u64,
    last_raw: u64,
    elapsed: u64,
    free_run: u64,
}

impl<C: RawCounter> MonotonicTimer<C> {
    /// Create a timer over `counter` and take the initial baseline.
    ///
    /// # Errors
    ///
    /// Returns [`BringupError::InvalidTimer`] if `tick_rate_hz` is zero.
    pub fn new(counter: C, tick_rate_hz: u64) -> BringupResult<Self> {
        if tick_rate_hz == 0 {
            return Err(BringupError::InvalidTimer("tick rate must be non-zero".into()));
        }
        let mut timer = Self {
            counter,
            tick_rate_hz,
            last_raw: 0,
            elapsed: 0,
            free_run: 0,
        };
        timer.reset();
        Ok(timer)
    }

    /// Create a timer using the tick rate from the `[timer]` section.
    ///
    /// # Errors
    ///
    /// Same as [`MonotonicTimer::new`].
    pub fn from_config(counter: C, config: &TimerConfig) -> BringupResult<Self> {
        Self::new(counter, config.tick_rate_hz)
    }

    /// Start a new reference point: sample the raw counter, zero the count.
    pub fn reset(&mut self) {
        self.last_raw = self.counter.read();
        self.elapsed = 0;
        self.free_run = 0;
        debug!(last_raw = self.last_raw, "Monotonic timer reset");
    }

    /// Ticks elapsed since the last reset, corrected for counter wraps.
    ///
    /// Never decreases between resets. The count sticks at `u64::MAX`
    /// (centuries at any real tick rate, or sooner after
    /// [`set_elapsed`](Self::set_elapsed)).
    pub fn elapsed_ticks(&mut self) -> u64 {
        let delta = self.sample();
        self.elapsed = self.elapsed.saturating_add(delta);
        self.elapsed
    }

    /// Read the raw counter and return the wrap-corrected ticks since the
    /// previous read, advancing the free-running count.
    fn sample(&mut self) -> u64 {
        let now = self.counter.read();
        let delta = if now >= self.last_raw {
            now - self.last_raw
        } else {
            let delta = (self.counter.max_value() - self.last_raw) + now;
            trace!(last_raw = self.last_raw, now, delta, "Raw counter wrapped");
            delta
        };
        self.last_raw = now;
        self.free_run = self.free_run.wrapping_add(delta);
        delta
    }

    /// Sample the counter, keeping the elapsed count current, and return the
    /// free-running count.
    fn free_running_ticks(&mut self) -> u64 {
        self.elapsed_ticks();
        self.free_run
    }

    /// Ticks elapsed since `base`, a value previously returned by
    /// [`elapsed_ticks`](Self::elapsed_ticks). Zero if `base` is ahead.
    pub fn elapsed_since(&mut self, base: u64) -> u64 {
        self.elapsed_ticks().saturating_sub(base)
    }

    /// Overwrite the accumulated tick count, keeping the raw baseline.
    ///
    /// The free-running count used by
    /// [`delay_us_masked`](Self::delay_us_masked) is set to the same value.
    pub fn set_elapsed(&mut self, ticks: u64) {
        self.elapsed = ticks;
        self.free_run = ticks;
    }

    /// Raw counter rate in ticks per second.
    #[must_use]
    pub fn tick_rate(&self) -> u64 {
        self.tick_rate_hz
    }

    /// The underlying raw counter.
    #[must_use]
    pub fn counter(&self) -> &C {
        &self.counter
    }

    /// Busy-wait for at least `usec` microseconds.
    ///
    /// The deadline is `elapsed_ticks() + ticks`. If that sum does not fit in
    /// a `u64`, the timer is reset first and the wait measured from the new
    /// baseline, so the deadline never appears to have already passed. Since
    /// the elapsed count saturates, a deadline that fits is always reached.
    /// Returns the number of ticks waited for.
    pub fn delay_us(&mut self, usec: u64) -> u64 {
        let ticks = ticks_for_us(usec, self.tick_rate_hz);
        let now = self.elapsed_ticks();

        let deadline = if let Some(deadline) = now.checked_add(ticks) {
            deadline
        } else {
            warn!(now, ticks, "Delay deadline exceeds tick range, resetting timer");
            self.reset();
            ticks
        };

        while self.elapsed_ticks() < deadline {
            hint::spin_loop();
        }
        ticks
    }

    /// Busy-wait for `usec` microseconds without ever resetting the timer.
    ///
    /// Runs on the free-running count, which wraps past `u64::MAX` where the
    /// elapsed count saturates. The deadline is computed with wrapping
    /// addition and compared through the signed difference `deadline - now`,
    /// which stays correct across the wrap as long as the delay is below
    /// `2^63` ticks. Returns once the count has moved strictly past the
    /// deadline.
    pub fn delay_us_masked(&mut self, usec: u64) -> u64 {
        let ticks = ticks_for_us(usec, self.tick_rate_hz);
        let deadline = self.free_running_ticks().wrapping_add(ticks);

        loop {
            let now = self.free_running_ticks();
            // Reinterpreting the wrapped difference is the point.
            #[allow(clippy::cast_possible_wrap)]
            let remaining = deadline.wrapping_sub(now) as i64;
            if remaining < 0 {
                break;
            }
            hint::spin_loop();
        }
        ticks
    }
}
