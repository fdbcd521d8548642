//! Physical memory access through `/dev/mem`.
//!
//! Lets a Linux host run the pattern test against a reserved physical range
//! (for example RAM carved out with `memmap=` on the kernel command line).
//! Requires `CAP_SYS_RAWIO` and a kernel without `STRICT_DEVMEM` for RAM.

use crate::bus::VolatileBus;
use crate::region::MemRegion;
use bringup_common::error::{BringupError, BringupResult};
use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};
use std::ffi::c_void;
use std::fs::OpenOptions;
use std::num::NonZeroUsize;
use std::os::unix::fs::OpenOptionsExt;
use std::ptr::NonNull;
use tracing::{debug, info, warn};

/// A shared, uncached mapping of a physical address range.
///
/// The mapping is page-aligned internally; [`PhysMapping::bus`] exposes only
/// the requested bytes, reported at their physical addresses.
#[derive(Debug)]
pub struct PhysMapping {
    region: MemRegion,
    map_ptr: NonNull<c_void>,
    map_len: usize,
    page_offset: usize,
}

impl PhysMapping {
    /// Map `region` (physical addresses) from `/dev/mem`.
    ///
    /// # Errors
    ///
    /// Returns [`BringupError::Mapping`] if `/dev/mem` cannot be opened or
    /// the range cannot be mapped.
    ///
    /// # Safety
    ///
    /// The physical range must be RAM that nothing else (kernel, devices,
    /// other processes) uses while the mapping lives. The test overwrites it.
    pub unsafe fn open(region: MemRegion) -> BringupResult<Self> {
        let page_size = page_size();
        let page_base = region.start() & !(page_size - 1);
        let page_offset = region.start() - page_base;
        let map_len = page_offset
            .checked_add(region.len())
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| BringupError::Mapping(format!("region {region} too large to map")))?;
        let file_offset = libc::off_t::try_from(page_base).map_err(|_| {
            BringupError::Mapping(format!("physical base 0x{page_base:x} exceeds off_t"))
        })?;

        debug!(%region, page_base, page_offset, "Opening /dev/mem");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open("/dev/mem")
            .map_err(|e| BringupError::Mapping(format!("failed to open /dev/mem: {e}")))?;

        let map_ptr = mmap(
            None,
            map_len,
            ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
            MapFlags::MAP_SHARED,
            &file,
            file_offset,
        )
        .map_err(|e| BringupError::Mapping(format!("mmap of {region} failed: {e}")))?;

        info!(%region, bytes = map_len.get(), "Physical region mapped");

        Ok(Self {
            region,
            map_ptr,
            map_len: map_len.get(),
            page_offset,
        })
    }

    /// The physical region this mapping covers.
    #[must_use]
    pub fn region(&self) -> MemRegion {
        self.region
    }

    /// Volatile access to the mapped bytes at their physical addresses.
    pub fn bus(&mut self) -> VolatileBus<'_> {
        // SAFETY: the mapping covers page_offset + region.len() bytes and is
        // exclusively borrowed for the lifetime of the bus.
        unsafe {
            let ptr = self.map_ptr.as_ptr().cast::<u8>().add(self.page_offset);
            VolatileBus::with_base(self.region.start(), ptr, self.region.len())
        }
    }
}

impl Drop for PhysMapping {
    fn drop(&mut self) {
        // SAFETY: map_ptr/map_len came from a successful mmap and no bus
        // borrowing it can outlive `self`.
        if let Err(e) = unsafe { munmap(self.map_ptr, self.map_len) } {
            warn!(region = %self.region, error = %e, "munmap failed");
        }
    }
}

fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(size)
        .ok()
        .filter(|s| s.is_power_of_two())
        .unwrap_or(4096)
}
