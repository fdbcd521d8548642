//! Configuration structures for the bring-up tools.
//!
//! Supports TOML deserialization with defaults that suit a host run and
//! explicit values for a board bring-up session.

use crate::error::{BringupError, BringupResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level bring-up configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BringupConfig {
    /// Monotonic timer configuration.
    pub timer: TimerConfig,

    /// Pattern memory test configuration.
    pub memtest: MemtestConfig,
}

/// Raw counter and delay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Rate at which the raw counter increments, in ticks per second.
    pub tick_rate_hz: u64,

    /// Width of the raw counter in bits; the counter wraps at `2^bits - 1`.
    pub counter_bits: u8,

    /// Longest busy-wait the CLI accepts.
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 1_000_000,
            counter_bits: 32,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl TimerConfig {
    /// Largest raw value the counter reports before wrapping to zero.
    ///
    /// # Errors
    ///
    /// Returns [`BringupError::InvalidTimer`] unless `counter_bits` is in `1..=64`.
    pub fn counter_max(&self) -> BringupResult<u64> {
        max_for_bits(self.counter_bits)
    }

    /// Time for the raw counter to wrap once.
    ///
    /// `elapsed_ticks()` must be sampled more often than this.
    ///
    /// # Errors
    ///
    /// Returns [`BringupError::InvalidTimer`] for a zero tick rate or a
    /// counter width outside `1..=64`.
    pub fn wrap_period(&self) -> BringupResult<Duration> {
        if self.tick_rate_hz == 0 {
            return Err(BringupError::InvalidTimer("tick rate must be non-zero".into()));
        }
        let ticks = u128::from(self.counter_max()?) + 1;
        let nanos = ticks * 1_000_000_000 / u128::from(self.tick_rate_hz);
        Ok(u64::try_from(nanos).map_or(Duration::MAX, Duration::from_nanos))
    }
}

/// Largest value of a counter `bits` wide.
///
/// # Errors
///
/// Returns [`BringupError::InvalidTimer`] unless `bits` is in `1..=64`.
pub fn max_for_bits(bits: u8) -> BringupResult<u64> {
    match bits {
        64 => Ok(u64::MAX),
        1..=63 => Ok((1u64 << bits) - 1),
        _ => Err(BringupError::InvalidTimer(format!(
            "counter width must be 1..=64 bits, got {bits}"
        ))),
    }
}

/// What the validator does after the first mismatching byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Report the first mismatch and stop validating.
    #[default]
    FailFast,
    /// Keep validating and record mismatches up to `max_mismatches`.
    Continue,
}

/// A physical address range to test through `/dev/mem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalRegion {
    /// First physical byte.
    pub start: u64,
    /// Last physical byte (inclusive).
    pub end: u64,
}

/// Pattern memory test configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemtestConfig {
    /// Mismatch handling during validation.
    pub policy: MismatchPolicy,

    /// Cap on recorded mismatches when `policy = "continue"`.
    pub max_mismatches: usize,

    /// Size of the host buffer tested when no physical region is given.
    pub buffer_size: usize,

    /// Number of fill/validate passes over the region.
    pub passes: u32,

    /// Lock the host buffer in RAM (mlockall) before testing.
    pub lock_memory: bool,

    /// Physical region to test instead of a host buffer.
    pub physical: Option<PhysicalRegion>,
}

impl Default for MemtestConfig {
    fn default() -> Self {
        Self {
            policy: MismatchPolicy::FailFast,
            max_mismatches: 64,
            buffer_size: 1024 * 1024, // 1 MiB
            passes: 1,
            lock_memory: false,
            physical: None,
        }
    }
}

impl BringupConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check values that parse fine but cannot drive a test run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timer.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("timer.tick_rate_hz must be non-zero".into()));
        }
        if let Err(e) = self.timer.counter_max() {
            return Err(ConfigError::Invalid(format!("timer.counter_bits: {e}")));
        }
        if self.memtest.buffer_size == 0 {
            return Err(ConfigError::Invalid("memtest.buffer_size must be non-zero".into()));
        }
        if self.memtest.passes == 0 {
            return Err(ConfigError::Invalid("memtest.passes must be non-zero".into()));
        }
        if let Some(region) = self.memtest.physical {
            if region.end < region.start {
                return Err(ConfigError::Invalid(format!(
                    "memtest.physical end 0x{:x} is below start 0x{:x}",
                    region.end, region.start
                )));
            }
        }
        tracing::debug!("configuration validated");
        Ok(())
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Parsed value is outside its usable range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
