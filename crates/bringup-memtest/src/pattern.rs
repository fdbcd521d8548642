//! The 257-byte reference pattern.
//!
//! The pattern length is odd, so it is coprime with every power-of-two
//! access width: tiling it across a region never lines up the same byte
//! with the same lane of a 16/32/64-bit bus twice in a row. The body
//! repeats a block of full-swing transitions
//!
//! ```text
//! FF FF FF FF FF FF FF FF
//! 00 00 00 00 00 00 00 00
//! FF FF FF FF FF FF FF FF
//! 00 00 AA AA AA AA 00 00
//! 55 55 55 55 55 55 55 55
//! AA AA AA AA AA AA AA AA
//! ```
//!
//! so every data line toggles 0↔1 simultaneously, which is what exposes
//! ground bounce from simultaneous output switching.

use static_assertions::const_assert;

/// Number of bytes in [`REFERENCE_PATTERN`].
pub const PATTERN_LEN: usize = 257;

// Odd length keeps the tiling out of phase with power-of-two strides.
const_assert!(PATTERN_LEN % 2 == 1);
const_assert!(PATTERN_LEN > 64);

/// Reference pattern written by the fill phase and checked by validation.
#[rustfmt::skip]
pub static REFERENCE_PATTERN: [u8; PATTERN_LEN] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0xAA, 0xAA, 0xAA, 0xAA, 0x00, 0x00,
    0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55,
    0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0xAA, 0xAA, 0xAA, 0xAA, 0x00, 0x00,
    0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55,
    0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0xAA, 0xAA, 0xAA, 0xAA, 0x00, 0x00,
    0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55,
    0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0xAA, 0xAA, 0xAA, 0xAA, 0x00, 0x00,
    0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55,
    0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0xAA, 0xAA, 0xAA, 0xAA, 0x00, 0x00,
    0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55,
    0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00,
];

/// Pattern byte expected at `offset` bytes past the start of a region.
#[inline]
#[must_use]
pub fn expected_at(offset: usize) -> u8 {
    REFERENCE_PATTERN[offset % PATTERN_LEN]
}
