//! Microsecond to tick conversion.

/// Microseconds per second.
pub const US_PER_SEC: u64 = 1_000_000;

/// Number of ticks that cover `usec` microseconds at `tick_rate_hz`.
///
/// Requests of 1000 µs or more are normalized to milliseconds before the
/// multiply, which keeps the intermediate product small at the cost of
/// dropping the sub-millisecond part. Smaller requests multiply first so
/// they are not truncated to zero. Products saturate instead of wrapping.
#[must_use]
pub fn ticks_for_us(usec: u64, tick_rate_hz: u64) -> u64 {
    if usec >= 1000 {
        (usec / 1000).saturating_mul(tick_rate_hz) / 1000
    } else {
        usec.saturating_mul(tick_rate_hz) / US_PER_SEC
    }
}
