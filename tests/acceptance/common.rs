//! Shared helpers for the acceptance suites.

#![allow(dead_code)] // Not every suite uses every helper

use bringup_memtest::{MemoryBus, SliceBus};

/// Whether the tests run with root privileges.
pub fn is_root() -> bool {
    // Effective UID from /proc avoids pulling libc into the test crate.
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| {
            status
                .lines()
                .find(|line| line.starts_with("Uid:"))
                .and_then(|line| line.split_whitespace().nth(2).map(str::to_owned))
        })
        .is_some_and(|euid| euid == "0")
}

/// Physical region from `BRINGUP_TEST_PHYS` (`START:END`, hex), if set.
pub fn reserved_physical_range() -> Option<(usize, usize)> {
    let value = std::env::var("BRINGUP_TEST_PHYS").ok()?;
    let (start, end) = value.split_once(':')?;
    let parse = |s: &str| usize::from_str_radix(s.trim().trim_start_matches("0x"), 16).ok();
    Some((parse(start)?, parse(end)?))
}

/// Host memory whose cells at `faulty` addresses never store bit 0.
pub struct LeakyCells<'a> {
    inner: SliceBus<'a>,
    faulty: Vec<usize>,
}

impl<'a> LeakyCells<'a> {
    pub fn new(base: usize, mem: &'a mut [u8], faulty: Vec<usize>) -> Self {
        Self {
            inner: SliceBus::new(base, mem),
            faulty,
        }
    }
}

impl MemoryBus for LeakyCells<'_> {
    fn read_u8(&self, address: usize) -> u8 {
        self.inner.read_u8(address)
    }

    fn write_u8(&mut self, address: usize, value: u8) {
        let value = if self.faulty.contains(&address) {
            value & !0x01
        } else {
            value
        };
        self.inner.write_u8(address, value);
    }
}
