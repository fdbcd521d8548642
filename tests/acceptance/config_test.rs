//! Configuration file acceptance.
//!
//! A board profile on disk drives both the timer and the tester.

use bringup_common::config::{BringupConfig, ConfigError, MismatchPolicy};
use bringup_memtest::ValidationMode;
use bringup_timer::{HostCounter, MonotonicTimer, RawCounter};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const BOARD_PROFILE: &str = r#"
[timer]
tick_rate_hz = 24000000
counter_bits = 32
max_delay = "500ms"

[memtest]
policy = "continue"
max_mismatches = 10
buffer_size = 65536
passes = 2
lock_memory = true
"#;

#[test]
fn test_board_profile_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(BOARD_PROFILE.as_bytes()).unwrap();

    let config = BringupConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.timer.tick_rate_hz, 24_000_000);
    assert_eq!(config.timer.max_delay, Duration::from_millis(500));
    // 2^32 ticks at 24 MHz.
    assert_eq!(config.timer.wrap_period().unwrap().as_secs(), 178);
    assert_eq!(config.memtest.policy, MismatchPolicy::Continue);
    assert!(config.memtest.lock_memory);
    assert_eq!(
        ValidationMode::from(&config.memtest),
        ValidationMode::ContinueOnMismatch { max_mismatches: 10 }
    );

    let counter = HostCounter::from_config(&config.timer).unwrap();
    assert_eq!(counter.max_value(), u64::from(u32::MAX));
    let timer = MonotonicTimer::from_config(counter, &config.timer).unwrap();
    assert_eq!(timer.tick_rate(), 24_000_000);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[memtest]").unwrap();
    writeln!(file, "passes = 4").unwrap();

    let config = BringupConfig::from_file(file.path()).unwrap();
    assert_eq!(config.memtest.passes, 4);
    assert_eq!(config.memtest.buffer_size, 1024 * 1024);
    assert_eq!(config.timer, BringupConfig::default().timer);
}

#[test]
fn test_saved_config_reloads() {
    let mut config = BringupConfig::default();
    config.timer.counter_bits = 24;
    config.memtest.passes = 7;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(config.to_toml().unwrap().as_bytes()).unwrap();

    assert_eq!(BringupConfig::from_file(file.path()).unwrap(), config);
}

#[test]
fn test_missing_file_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = BringupConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_invalid_values_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[timer]").unwrap();
    writeln!(file, "tick_rate_hz = 0").unwrap();
    let config = BringupConfig::from_file(file.path()).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[memtest]").unwrap();
    writeln!(file, "policy = \"sometimes\"").unwrap();
    assert!(matches!(
        BringupConfig::from_file(file.path()),
        Err(ConfigError::Parse(_))
    ));
}
