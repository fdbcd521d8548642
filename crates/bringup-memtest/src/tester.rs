//! Fill-then-validate pattern test.
//!
//! # Algorithm
//!
//! 1. **Fill**: tile [`REFERENCE_PATTERN`] from the region start, one
//!    257-byte block store per whole block, then the tail byte by byte from
//!    the start of the pattern. The split is only for throughput; the result
//!    is the same as a naive byte-by-byte tiling.
//! 2. **Validate**: re-read every byte and compare it with the pattern at
//!    `offset mod 257`, using a cyclic cursor independent of the fill split.
//!
//! Validation stops at the first mismatch unless the tester runs in
//! [`ValidationMode::ContinueOnMismatch`].

use crate::bus::MemoryBus;
use crate::pattern::{PATTERN_LEN, REFERENCE_PATTERN};
use crate::region::MemRegion;
use bringup_common::config::{MemtestConfig, MismatchPolicy};
use bringup_common::error::{BringupError, BringupResult};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// What validation does after a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Report the first mismatch and stop.
    #[default]
    FailFast,
    /// Record mismatches and keep going until `max_mismatches` are recorded.
    ContinueOnMismatch {
        /// Cap on recorded mismatches; zero is treated as one.
        max_mismatches: usize,
    },
}

impl From<&MemtestConfig> for ValidationMode {
    fn from(config: &MemtestConfig) -> Self {
        match config.policy {
            MismatchPolicy::FailFast => Self::FailFast,
            MismatchPolicy::Continue => Self::ContinueOnMismatch {
                max_mismatches: config.max_mismatches,
            },
        }
    }
}

/// Work done by the fill phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FillStats {
    /// Whole pattern blocks stored.
    pub blocks: usize,
    /// Bytes written individually after the last whole block.
    pub tail_bytes: usize,
}

/// A byte that did not read back as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// Address of the faulting byte.
    pub address: usize,
    /// Value read back.
    pub observed: u8,
    /// Pattern value written there.
    pub expected: u8,
}

impl From<Mismatch> for BringupError {
    fn from(m: Mismatch) -> Self {
        BringupError::PatternMismatch {
            address: m.address,
            observed: m.observed,
            expected: m.expected,
        }
    }
}

/// Outcome of validating a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemtestReport {
    /// First byte tested.
    pub start: usize,
    /// Last byte tested (inclusive).
    pub end: usize,
    /// Bytes compared before validation finished or stopped.
    pub bytes_checked: usize,
    /// Mismatches in address order.
    pub mismatches: Vec<Mismatch>,
    /// Validation stopped before reaching `end`.
    pub stopped_early: bool,
}

impl MemtestReport {
    /// Whether every byte read back as written.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// The lowest faulting address, if any.
    #[must_use]
    pub fn first_mismatch(&self) -> Option<&Mismatch> {
        self.mismatches.first()
    }

    /// Convert a failing report into [`BringupError::PatternMismatch`].
    ///
    /// # Errors
    ///
    /// Returns the first mismatch as an error if the test failed.
    pub fn into_result(self) -> BringupResult<Self> {
        match self.first_mismatch() {
            Some(&m) => Err(m.into()),
            None => Ok(self),
        }
    }
}

/// Destructive pattern tester.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternTester {
    mode: ValidationMode,
}

impl PatternTester {
    /// Create a fail-fast tester.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tester with an explicit validation mode.
    #[must_use]
    pub fn with_mode(mode: ValidationMode) -> Self {
        Self { mode }
    }

    /// Current validation mode.
    #[must_use]
    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Fill and validate the inclusive range `[start, end]`.
    ///
    /// A failing test is an `Ok` report with mismatches; use
    /// [`MemtestReport::into_result`] to turn it into an error.
    ///
    /// # Errors
    ///
    /// Returns [`BringupError::InvalidRange`] if `end < start`. Nothing is
    /// read or written in that case.
    pub fn test_range<B>(&self, bus: &mut B, start: usize, end: usize) -> BringupResult<MemtestReport>
    where
        B: MemoryBus + ?Sized,
    {
        let region = MemRegion::new(start, end)?;
        Ok(self.run(bus, region))
    }

    /// Fill and validate an already-checked region.
    pub fn run<B>(&self, bus: &mut B, region: MemRegion) -> MemtestReport
    where
        B: MemoryBus + ?Sized,
    {
        self.fill(bus, region);
        self.validate(bus, region)
    }

    /// Tile the pattern across `region`.
    pub fn fill<B>(&self, bus: &mut B, region: MemRegion) -> FillStats
    where
        B: MemoryBus + ?Sized,
    {
        info!("Filling 0x{:08x} ... 0x{:08x}", region.start(), region.end());

        let blocks = region.len() / PATTERN_LEN;
        let tail_bytes = region.len() % PATTERN_LEN;

        for block in 0..blocks {
            bus.write_block(region.start() + block * PATTERN_LEN, &REFERENCE_PATTERN);
        }

        let tail_start = region.start() + blocks * PATTERN_LEN;
        for (i, &byte) in REFERENCE_PATTERN[..tail_bytes].iter().enumerate() {
            bus.write_u8(tail_start + i, byte);
        }

        debug!(blocks, tail_bytes, "Fill complete");
        FillStats { blocks, tail_bytes }
    }

    /// Compare `region` against the pattern it was filled with.
    pub fn validate<B>(&self, bus: &B, region: MemRegion) -> MemtestReport
    where
        B: MemoryBus + ?Sized,
    {
        info!("Validating......");

        let limit = match self.mode {
            ValidationMode::FailFast => 1,
            ValidationMode::ContinueOnMismatch { max_mismatches } => max_mismatches.max(1),
        };

        let mut mismatches = Vec::new();
        let mut cursor = 0;
        let mut bytes_checked = 0;

        for offset in 0..region.len() {
            let address = region.start() + offset;
            let expected = REFERENCE_PATTERN[cursor];
            let observed = bus.read_u8(address);
            bytes_checked += 1;

            if observed != expected {
                error!(
                    "Error@0x{address:x}, value=0x{observed:x}, but shall be 0x{expected:x}."
                );
                mismatches.push(Mismatch {
                    address,
                    observed,
                    expected,
                });
                if mismatches.len() >= limit {
                    break;
                }
            }

            cursor += 1;
            if cursor == PATTERN_LEN {
                cursor = 0;
            }
        }

        let stopped_early = bytes_checked < region.len();
        if mismatches.is_empty() {
            info!("Memory test passed.");
        } else if stopped_early && limit > 1 {
            warn!(
                recorded = mismatches.len(),
                unchecked = region.len() - bytes_checked,
                "Mismatch limit reached, validation stopped"
            );
        }

        MemtestReport {
            start: region.start(),
            end: region.end(),
            bytes_checked,
            mismatches,
            stopped_early,
        }
    }
}
