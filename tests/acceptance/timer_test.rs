//! Monotonic timer acceptance.
//!
//! # Acceptance Criteria
//!
//! - Delays never return early, including across raw counter wraps
//! - Elapsed ticks never decrease between resets
//! - A timer shared between threads stays consistent

use bringup_timer::{
    HostCounter, MonotonicTimer, RawCounter, SharedTimer, SimulatedCounter,
};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_delays_on_wrapping_host_counter() {
    // 12-bit counter at 1 MHz wraps every ~4 ms; each delay spans several wraps.
    let counter = HostCounter::new(1_000_000, 12).unwrap();
    let mut timer = MonotonicTimer::new(counter, 1_000_000).unwrap();

    for usec in [0, 500, 5_000, 15_000] {
        let started = Instant::now();
        timer.delay_us(usec);
        assert!(
            started.elapsed() >= Duration::from_micros(usec),
            "{usec} us delay returned early"
        );
    }
}

#[test]
fn test_masked_delay_on_host_counter() {
    let counter = HostCounter::new(1_000_000, 16).unwrap();
    let mut timer = MonotonicTimer::new(counter, 1_000_000).unwrap();

    let started = Instant::now();
    timer.delay_us_masked(3_000);
    assert!(started.elapsed() >= Duration::from_millis(3));
}

#[test]
fn test_elapsed_monotonic_near_wrap_point() {
    let counter = HostCounter::new(1_000_000, 32).unwrap().with_offset(0xFFFF_FF00);
    let mut timer = MonotonicTimer::new(counter, 1_000_000).unwrap();

    let mut previous = timer.elapsed_ticks();
    let deadline = Instant::now() + Duration::from_millis(5);
    while Instant::now() < deadline {
        let now = timer.elapsed_ticks();
        assert!(now >= previous);
        previous = now;
    }
    // Started 256 ticks below the wrap and ran for 5 ms at 1 MHz.
    assert!(timer.counter().read() < 0xFFFF_FF00);
    assert!(previous >= 4_000);
}

#[test]
fn test_shared_timer_across_threads() {
    let counter = SimulatedCounter::new(0).stepping(1);
    let shared = SharedTimer::new(MonotonicTimer::new(counter, 1_000_000).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let timer = shared.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    timer.delay_us(50);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Forty 50-tick delays, serialized by the lock.
    assert!(shared.elapsed_ticks() >= 40 * 50);
}
