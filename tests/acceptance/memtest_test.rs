//! Pattern memory test acceptance.
//!
//! # Acceptance Criteria
//!
//! - Fault-free memory passes on every pass
//! - A stuck bit is reported at its address with observed and expected bytes
//! - Continue mode maps every fault; fail-fast stops at the first
//! - Configuration selects the validation mode

use super::common::{is_root, reserved_physical_range, LeakyCells};
use bringup_common::config::{BringupConfig, MismatchPolicy};
use bringup_common::error::BringupError;
use bringup_memtest::{expected_at, PatternTester, SliceBus, ValidationMode, VolatileBus};

#[test]
fn test_host_buffer_multiple_passes() {
    let mut ram = vec![0u8; 64 * 1024];
    let mut bus = VolatileBus::from_slice(&mut ram);
    let region = bus.region().unwrap();
    let tester = PatternTester::new();

    for _ in 0..3 {
        let report = tester.run(&mut bus, region);
        assert!(report.passed());
        assert_eq!(report.bytes_checked, 64 * 1024);
    }
    drop(bus);

    assert!(ram.iter().enumerate().all(|(i, &b)| b == expected_at(i)));
}

#[test]
fn test_unaligned_start() {
    let mut ram = vec![0u8; 1000];
    let mut bus = SliceBus::new(0x2000_0003, &mut ram);
    let report = PatternTester::new()
        .test_range(&mut bus, 0x2000_0003, 0x2000_0003 + 999)
        .unwrap();
    assert!(report.passed());
    assert_eq!(report.start, 0x2000_0003);
    assert_eq!(report.end, 0x2000_03EA);
}

#[test]
fn test_stuck_bit_is_reported() {
    // Offset 0 holds 0xFF, so a cell that drops bit 0 reads back 0xFE.
    let base = 0x8000_0000;
    let mut ram = vec![0u8; 2048];
    let mut bus = LeakyCells::new(base, &mut ram, vec![base + 257]);

    let report = PatternTester::new().test_range(&mut bus, base, base + 2047).unwrap();
    let err = report.into_result().unwrap_err();
    assert_eq!(
        err,
        BringupError::PatternMismatch {
            address: base + 257,
            observed: 0xFE,
            expected: 0xFF,
        }
    );
    assert_eq!(
        err.to_string(),
        "pattern mismatch @0x80000101: value=0xfe, expected 0xff"
    );
}

#[test]
fn test_continue_mode_maps_all_faults() {
    let base = 0x1000;
    // Offsets whose pattern byte has bit 0 set, so the leak shows.
    let faulty: Vec<usize> = [0usize, 257, 700, 1500]
        .iter()
        .filter(|&&off| expected_at(off) & 0x01 != 0)
        .map(|off| base + off)
        .collect();
    assert!(!faulty.is_empty());

    let mut ram = vec![0u8; 2048];
    let mut bus = LeakyCells::new(base, &mut ram, faulty.clone());
    let tester = PatternTester::with_mode(ValidationMode::ContinueOnMismatch {
        max_mismatches: 100,
    });

    let report = tester.test_range(&mut bus, base, base + 2047).unwrap();
    let addresses: Vec<usize> = report.mismatches.iter().map(|m| m.address).collect();
    assert_eq!(addresses, faulty);
    assert_eq!(report.bytes_checked, 2048);
    assert!(!report.stopped_early);

    let report = PatternTester::new().test_range(&mut bus, base, base + 2047).unwrap();
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(report.mismatches[0].address, faulty[0]);
}

#[test]
fn test_config_selects_mode() {
    let config = BringupConfig::from_toml(
        r#"
[memtest]
policy = "continue"
max_mismatches = 2
"#,
    )
    .unwrap();
    assert_eq!(config.memtest.policy, MismatchPolicy::Continue);

    let tester = PatternTester::with_mode(ValidationMode::from(&config.memtest));
    let mut ram = vec![0u8; 600];
    let mut bus = SliceBus::new(0, &mut ram);
    let region = bus.region().unwrap();
    tester.fill(&mut bus, region);
    drop(bus);
    for cell in &mut ram[100..110] {
        *cell = !*cell;
    }

    let bus = SliceBus::new(0, &mut ram);
    let report = tester.validate(&bus, region);
    assert_eq!(report.mismatches.len(), 2);
    assert!(report.stopped_early);
}

#[test]
fn test_inverted_range_rejected() {
    let mut ram = vec![0x5Au8; 16];
    let mut bus = SliceBus::new(0x100, &mut ram);
    let err = PatternTester::new().test_range(&mut bus, 0x10F, 0x100).unwrap_err();
    assert!(matches!(err, BringupError::InvalidRange { .. }));
    assert!(bus.bytes().iter().all(|&b| b == 0x5A));
}

#[cfg(target_os = "linux")]
#[test]
#[ignore = "requires root and BRINGUP_TEST_PHYS=START:END naming reserved RAM"]
#[allow(unsafe_code)]
fn test_physical_region_through_dev_mem() {
    use bringup_memtest::{MemRegion, PhysMapping};

    if !is_root() {
        eprintln!("Skipping: requires root");
        return;
    }
    let Some((start, end)) = reserved_physical_range() else {
        eprintln!("Skipping: BRINGUP_TEST_PHYS not set");
        return;
    };

    let region = MemRegion::new(start, end).unwrap();
    // SAFETY: the operator reserved this range for the test.
    let mut mapping = unsafe { PhysMapping::open(region) }.unwrap();
    let mut bus = mapping.bus();
    let report = PatternTester::new().run(&mut bus, region);
    assert!(report.passed(), "first mismatch: {:?}", report.first_mismatch());
}
