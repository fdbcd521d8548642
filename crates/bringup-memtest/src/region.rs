//! Inclusive address ranges handed to the tester.

use bringup_common::error::{BringupError, BringupResult};
use std::fmt;

/// An inclusive, non-empty byte range `[start, end]`.
///
/// Construction is the only place the caller contract is checked, so an
/// inverted range is rejected before any memory is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRegion {
    start: usize,
    end: usize,
    len: usize,
}

impl MemRegion {
    /// Create a region from inclusive bounds.
    ///
    /// # Errors
    ///
    /// Returns [`BringupError::InvalidRange`] if `end < start` or the range
    /// spans the whole address space.
    pub fn new(start: usize, end: usize) -> BringupResult<Self> {
        if end < start {
            return Err(BringupError::InvalidRange { start, end });
        }
        let len = (end - start)
            .checked_add(1)
            .ok_or(BringupError::InvalidRange { start, end })?;
        Ok(Self { start, end, len })
    }

    /// Create a region of `len` bytes beginning at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`BringupError::InvalidRange`] if `len` is zero or the
    /// region would run past the end of the address space.
    pub fn with_len(start: usize, len: usize) -> BringupResult<Self> {
        let end = len
            .checked_sub(1)
            .and_then(|last| start.checked_add(last))
            .ok_or(BringupError::InvalidRange {
                start,
                end: start.wrapping_add(len).wrapping_sub(1),
            })?;
        Self::new(start, end)
    }

    /// First byte of the region.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Last byte of the region (inclusive).
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of bytes in the region; never zero.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether `address` lies inside the region.
    #[must_use]
    pub fn contains(&self, address: usize) -> bool {
        (self.start..=self.end).contains(&address)
    }
}

impl fmt::Display for MemRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x} ... 0x{:08x}", self.start, self.end)
    }
}
