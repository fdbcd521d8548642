//! Byte-level access to the memory under test.
//!
//! The tester only ever talks to a [`MemoryBus`]. Two implementations are
//! provided:
//!
//! - [`SliceBus`]: plain loads and stores on a borrowed buffer, exposed at
//!   an arbitrary base address. Used for host runs and tests.
//! - [`VolatileBus`]: volatile loads and stores, so every access reaches the
//!   memory cells. Used for real RAM, either a locked host buffer or a
//!   physical range mapped through `/dev/mem`.

use crate::pattern::PATTERN_LEN;
use crate::region::MemRegion;
use bringup_common::error::BringupResult;
use std::marker::PhantomData;
use std::ptr;

/// Read/write access to a byte-addressed memory range.
///
/// Addresses are absolute (the value reported in diagnostics), not offsets.
/// Implementations may panic on addresses outside the range they cover;
/// staying inside it is the caller's contract.
pub trait MemoryBus {
    /// Read one byte.
    fn read_u8(&self, address: usize) -> u8;

    /// Write one byte.
    fn write_u8(&mut self, address: usize, value: u8);

    /// Write a contiguous block starting at `address`.
    ///
    /// The default writes byte by byte; implementations override it with a
    /// bulk copy. Both must leave identical contents behind.
    fn write_block(&mut self, address: usize, block: &[u8]) {
        for (i, &byte) in block.iter().enumerate() {
            self.write_u8(address + i, byte);
        }
    }
}

/// A host buffer exposed at `base`.
#[derive(Debug)]
pub struct SliceBus<'a> {
    base: usize,
    mem: &'a mut [u8],
}

impl<'a> SliceBus<'a> {
    /// Expose `mem` so that `mem[0]` lives at address `base`.
    pub fn new(base: usize, mem: &'a mut [u8]) -> Self {
        Self { base, mem }
    }

    /// The whole buffer as a test region.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty.
    pub fn region(&self) -> BringupResult<MemRegion> {
        MemRegion::with_len(self.base, self.mem.len())
    }

    /// Current buffer contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.mem[..]
    }

    #[inline]
    fn offset(&self, address: usize) -> usize {
        address - self.base
    }
}

impl MemoryBus for SliceBus<'_> {
    #[inline]
    fn read_u8(&self, address: usize) -> u8 {
        self.mem[self.offset(address)]
    }

    #[inline]
    fn write_u8(&mut self, address: usize, value: u8) {
        let offset = self.offset(address);
        self.mem[offset] = value;
    }

    fn write_block(&mut self, address: usize, block: &[u8]) {
        let offset = self.offset(address);
        self.mem[offset..offset + block.len()].copy_from_slice(block);
    }
}

/// Volatile access to a memory range.
///
/// `base` is the address reported to callers; `ptr` is where that address
/// is reachable in this process. They differ for `/dev/mem` mappings.
#[derive(Debug)]
pub struct VolatileBus<'a> {
    base: usize,
    ptr: *mut u8,
    len: usize,
    _mem: PhantomData<&'a mut [u8]>,
}

impl<'a> VolatileBus<'a> {
    /// Volatile access to a borrowed buffer, addressed by its real location.
    pub fn from_slice(mem: &'a mut [u8]) -> Self {
        Self {
            base: mem.as_ptr() as usize,
            ptr: mem.as_mut_ptr(),
            len: mem.len(),
            _mem: PhantomData,
        }
    }

    /// Volatile access to `len` bytes of identity-mapped memory at `start`.
    ///
    /// # Safety
    ///
    /// `start..start + len` must be valid for reads and writes for `'a`,
    /// and nothing else may use it meanwhile. The test destroys its contents.
    pub unsafe fn from_raw(start: usize, len: usize) -> Self {
        Self::with_base(start, start as *mut u8, len)
    }

    /// Volatile access to `len` bytes at `ptr`, reported as `base`.
    ///
    /// # Safety
    ///
    /// Same as [`VolatileBus::from_raw`], for the range starting at `ptr`.
    pub unsafe fn with_base(base: usize, ptr: *mut u8, len: usize) -> Self {
        Self {
            base,
            ptr,
            len,
            _mem: PhantomData,
        }
    }

    /// The whole mapped range as a test region.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is empty.
    pub fn region(&self) -> BringupResult<MemRegion> {
        MemRegion::with_len(self.base, self.len)
    }

    #[inline]
    fn slot(&self, address: usize, width: usize) -> *mut u8 {
        let offset = address.wrapping_sub(self.base);
        assert!(
            offset <= self.len && width <= self.len - offset,
            "address 0x{address:x} outside bus 0x{:x}+{}",
            self.base,
            self.len
        );
        // SAFETY: offset + width is within the range validated at construction.
        unsafe { self.ptr.add(offset) }
    }
}

impl MemoryBus for VolatileBus<'_> {
    #[inline]
    fn read_u8(&self, address: usize) -> u8 {
        let src = self.slot(address, 1);
        // SAFETY: `slot` bounds-checked the address.
        unsafe { ptr::read_volatile(src) }
    }

    #[inline]
    fn write_u8(&mut self, address: usize, value: u8) {
        let dst = self.slot(address, 1);
        // SAFETY: `slot` bounds-checked the address.
        unsafe { ptr::write_volatile(dst, value) }
    }

    fn write_block(&mut self, address: usize, block: &[u8]) {
        let dst = self.slot(address, block.len());
        if let Ok(whole) = <&[u8; PATTERN_LEN]>::try_from(block) {
            // One aggregate store per pattern block; [u8; N] has alignment 1.
            // SAFETY: `slot` bounds-checked the full block.
            unsafe { ptr::write_volatile(dst.cast::<[u8; PATTERN_LEN]>(), *whole) }
            return;
        }
        for (i, &byte) in block.iter().enumerate() {
            // SAFETY: `slot` bounds-checked the full block.
            unsafe { ptr::write_volatile(dst.add(i), byte) }
        }
    }
}
