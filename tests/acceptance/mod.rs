//! Acceptance test suites.

mod common;
mod config_test;
mod memtest_test;
mod timer_test;
