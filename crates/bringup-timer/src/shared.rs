//! Thread-safe handle for hosts with more than one execution context.
//!
//! On a bootloader the timer runs single-threaded and [`MonotonicTimer`]
//! is used directly. When several threads must read the same timeline, a
//! lost update of `last_raw`/`elapsed` would corrupt it for good, so every
//! operation here holds the lock across the whole read-modify-write.

use crate::counter::RawCounter;
use crate::monotonic::MonotonicTimer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A [`MonotonicTimer`] behind a mutex.
#[derive(Debug)]
pub struct SharedTimer<C: RawCounter> {
    inner: Arc<Mutex<MonotonicTimer<C>>>,
}

impl<C: RawCounter> Clone for SharedTimer<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: RawCounter> SharedTimer<C> {
    /// Share `timer` between threads.
    pub fn new(timer: MonotonicTimer<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(timer)),
        }
    }

    /// See [`MonotonicTimer::elapsed_ticks`].
    pub fn elapsed_ticks(&self) -> u64 {
        self.lock().elapsed_ticks()
    }

    /// See [`MonotonicTimer::reset`].
    pub fn reset(&self) {
        self.lock().reset();
    }

    /// See [`MonotonicTimer::delay_us`]. Holds the lock for the whole wait.
    pub fn delay_us(&self, usec: u64) -> u64 {
        self.lock().delay_us(usec)
    }

    /// Run `f` with exclusive access to the timer.
    pub fn with<R>(&self, f: impl FnOnce(&mut MonotonicTimer<C>) -> R) -> R {
        f(&mut self.lock())
    }

    // Timer state is two plain words; a panic mid-update cannot leave it
    // worse than a lost sample, so poisoning is not propagated.
    fn lock(&self) -> MutexGuard<'_, MonotonicTimer<C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::SimulatedCounter;
    use std::thread;

    #[test]
    fn test_concurrent_samples_never_lose_ticks() {
        let counter = SimulatedCounter::with_max(0, 0xFFF).stepping(3);
        let shared = SharedTimer::new(MonotonicTimer::new(counter, 1_000_000).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let timer = shared.clone();
                thread::spawn(move || {
                    let mut previous = 0;
                    for _ in 0..1000 {
                        let now = timer.elapsed_ticks();
                        assert!(now >= previous);
                        previous = now;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 4000 samples plus this one, 3 ticks apart, after the baseline read.
        // The wrap correction counts one tick short per 12-bit wrap.
        let total = shared.elapsed_ticks();
        let raw_ticks = 3 * 4001;
        let wraps = raw_ticks / 0x1000;
        assert_eq!(total, raw_ticks - wraps);
    }

    #[test]
    fn test_with_and_reset() {
        let shared = SharedTimer::new(MonotonicTimer::new(SimulatedCounter::new(0), 1000).unwrap());
        shared.with(|t| t.counter().set(50));
        assert_eq!(shared.elapsed_ticks(), 50);
        shared.reset();
        assert_eq!(shared.elapsed_ticks(), 0);
        assert_eq!(shared.with(|t| t.tick_rate()), 1000);
    }
}
