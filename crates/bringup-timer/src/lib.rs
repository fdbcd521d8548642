//! Monotonic elapsed time over a wrapping hardware counter.
//!
//! - **Counters** ([`counter`]): the raw free-running counter seam
//! - **Conversion** ([`convert`]): microseconds to ticks without overflow
//! - **Timer** ([`monotonic`]): wrap-corrected tick count and busy-wait delays
//! - **Sharing** ([`shared`]): mutex-guarded timer for multi-threaded hosts
//!
//! # Example
//!
//! ```
//! use bringup_timer::{MonotonicTimer, SimulatedCounter};
//!
//! // 32-bit counter two ticks below its wrap point.
//! let counter = SimulatedCounter::new(0xFFFF_FFFD);
//! let mut timer = MonotonicTimer::new(counter, 1_000_000).unwrap();
//!
//! timer.counter().set(0x0000_0004);
//! assert_eq!(timer.elapsed_ticks(), 2 + 4);
//! ```

pub mod convert;
pub mod counter;
pub mod monotonic;
pub mod shared;

pub use convert::{ticks_for_us, US_PER_SEC};
pub use counter::{max_for_bits, HostCounter, MmioCounter, RawCounter, SimulatedCounter};
pub use monotonic::MonotonicTimer;
pub use shared::SharedTimer;
