use thiserror::Error;

/// Bring-up error types covering caller contract violations, memory faults,
/// and configuration problems.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BringupError {
    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Test region is inverted (`end < start`) or otherwise unusable.
    #[error("invalid memory range 0x{start:08x} ... 0x{end:08x}")]
    InvalidRange {
        /// First byte of the requested range.
        start: usize,
        /// Last byte of the requested range (inclusive).
        end: usize,
    },

    /// Read-back byte differs from the reference pattern.
    #[error("pattern mismatch @0x{address:x}: value=0x{observed:x}, expected 0x{expected:x}")]
    PatternMismatch {
        /// Address of the faulting byte.
        address: usize,
        /// Value read back from memory.
        observed: u8,
        /// Value the pattern placed there.
        expected: u8,
    },

    /// Tick rate or counter width cannot drive a monotonic timer.
    #[error("invalid timer configuration: {0}")]
    InvalidTimer(String),

    /// Physical memory could not be mapped into the address space.
    #[error("memory mapping failed: {0}")]
    Mapping(String),
}

/// Convenience type alias for bring-up operations.
pub type BringupResult<T> = Result<T, BringupError>;
