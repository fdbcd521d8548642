//! Destructive RAM verification with a 257-byte march pattern.
//!
//! - **Pattern** ([`pattern`]): the compiled-in reference bytes
//! - **Regions** ([`region`]): inclusive, non-empty address ranges
//! - **Access** ([`bus`]): the [`MemoryBus`] seam and its implementations
//! - **Tester** ([`tester`]): fill, validate, and report
//!
//! # Example
//!
//! ```
//! use bringup_memtest::{PatternTester, SliceBus};
//!
//! let mut ram = vec![0u8; 514];
//! let mut bus = SliceBus::new(0x1000, &mut ram);
//!
//! let report = PatternTester::new().test_range(&mut bus, 0x1000, 0x1201).unwrap();
//! assert!(report.passed());
//! assert_eq!(report.bytes_checked, 514);
//! ```

pub mod bus;
pub mod pattern;
#[cfg(target_os = "linux")]
pub mod phys;
pub mod region;
pub mod tester;

pub use bus::{MemoryBus, SliceBus, VolatileBus};
pub use pattern::{expected_at, PATTERN_LEN, REFERENCE_PATTERN};
#[cfg(target_os = "linux")]
pub use phys::PhysMapping;
pub use region::MemRegion;
pub use tester::{FillStats, MemtestReport, Mismatch, PatternTester, ValidationMode};
