//! Host-side bring-up runner.
//!
//! Runs the destructive pattern test over a host buffer or a physical range
//! mapped from `/dev/mem`, and exercises the monotonic delay on the host
//! clock.

use anyhow::{bail, Context, Result};
use bringup_common::config::{BringupConfig, MismatchPolicy, PhysicalRegion};
use bringup_memtest::{MemRegion, MemtestReport, PatternTester, ValidationMode, VolatileBus};
use bringup_timer::{HostCounter, MonotonicTimer};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Bring-up command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "bringup",
    about = "RAM pattern test and monotonic delay for hardware bring-up",
    version,
    long_about = None
)]
struct Args {
    /// Path to a bring-up configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill and validate memory with the reference pattern.
    Memtest {
        /// Host buffer size in bytes (overrides config file).
        #[arg(long)]
        size: Option<usize>,

        /// Number of passes (overrides config file).
        #[arg(long)]
        passes: Option<u32>,

        /// Record every mismatch instead of stopping at the first.
        #[arg(long)]
        continue_on_mismatch: bool,

        /// Physical range to test through /dev/mem, as START:END (inclusive).
        #[arg(long, value_name = "START:END", value_parser = parse_physical)]
        physical: Option<PhysicalRegion>,
    },

    /// Busy-wait on the host counter and report the ticks observed.
    Delay {
        /// Delay in microseconds.
        #[arg(long)]
        usec: u64,
    },

    /// Print the effective configuration as TOML.
    PrintConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting bringup");

    let mut config = load_config(&args)?;
    apply_overrides(&mut config, &args.command);
    config.validate().context("Invalid configuration")?;

    match args.command {
        Command::Memtest { .. } => run_memtest(&config),
        Command::Delay { usec } => run_delay(&config, usec),
        Command::PrintConfig => {
            let rendered = config.to_toml().context("Failed to render configuration")?;
            println!("{rendered}");
            Ok(())
        }
    }
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!(
        "bringup={level},bringup_memtest={level},bringup_timer={level},bringup_common={level}"
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `BRINGUP_CONFIG_PATH` environment variable
/// 3. `/etc/bringup/config.toml` (system path)
/// 4. `config/default.toml` (local development)
/// 5. Built-in defaults
fn load_config(args: &Args) -> Result<BringupConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return BringupConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("BRINGUP_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from BRINGUP_CONFIG_PATH");
            return BringupConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from BRINGUP_CONFIG_PATH={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "BRINGUP_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    for path in ["/etc/bringup/config.toml", "config/default.toml"] {
        let config_path = PathBuf::from(path);
        if config_path.exists() {
            info!(?config_path, "Loading config file");
            return BringupConfig::from_file(&config_path)
                .with_context(|| format!("Failed to load config from {config_path:?}"));
        }
    }

    info!("No config file found, using built-in defaults");
    Ok(BringupConfig::default())
}

/// Fold command-line flags into the loaded configuration.
fn apply_overrides(config: &mut BringupConfig, command: &Command) {
    if let Command::Memtest {
        size,
        passes,
        continue_on_mismatch,
        physical,
    } = command
    {
        if let Some(size) = size {
            config.memtest.buffer_size = *size;
        }
        if let Some(passes) = passes {
            config.memtest.passes = *passes;
        }
        if *continue_on_mismatch {
            config.memtest.policy = MismatchPolicy::Continue;
        }
        if physical.is_some() {
            config.memtest.physical = *physical;
        }
    }
}

/// Parse `START:END` with decimal or `0x`-prefixed hex addresses.
fn parse_physical(s: &str) -> std::result::Result<PhysicalRegion, String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got {s:?}"))?;
    let region = PhysicalRegion {
        start: parse_address(start)?,
        end: parse_address(end)?,
    };
    if region.end < region.start {
        return Err(format!(
            "end 0x{:x} is below start 0x{:x}",
            region.end, region.start
        ));
    }
    Ok(region)
}

fn parse_address(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn run_memtest(config: &BringupConfig) -> Result<()> {
    let memtest = &config.memtest;
    let tester = PatternTester::with_mode(ValidationMode::from(memtest));

    if memtest.lock_memory {
        lock_memory()?;
    }

    let mut failed = false;
    match memtest.physical {
        Some(physical) => {
            let region = physical_region(physical)?;
            for pass in 1..=memtest.passes {
                info!(pass, passes = memtest.passes, %region, "Starting pass");
                let report = run_physical_pass(&tester, region)?;
                failed |= !summarize(pass, &report);
                if failed && memtest.policy == MismatchPolicy::FailFast {
                    break;
                }
            }
        }
        None => {
            let mut buffer = vec![0u8; memtest.buffer_size];
            let mut bus = VolatileBus::from_slice(&mut buffer);
            let region = bus.region().context("Empty test buffer")?;
            for pass in 1..=memtest.passes {
                info!(pass, passes = memtest.passes, %region, "Starting pass");
                let report = tester.run(&mut bus, region);
                failed |= !summarize(pass, &report);
                if failed && memtest.policy == MismatchPolicy::FailFast {
                    break;
                }
            }
        }
    }

    if failed {
        bail!("memory test failed");
    }
    Ok(())
}

/// Log a pass outcome; returns whether the pass was clean.
fn summarize(pass: u32, report: &MemtestReport) -> bool {
    if report.passed() {
        debug!(pass, bytes = report.bytes_checked, "Pass clean");
        return true;
    }
    error!(
        pass,
        mismatches = report.mismatches.len(),
        bytes_checked = report.bytes_checked,
        stopped_early = report.stopped_early,
        "Pass failed"
    );
    false
}

fn physical_region(physical: PhysicalRegion) -> Result<MemRegion> {
    let start = usize::try_from(physical.start).context("Physical start exceeds address width")?;
    let end = usize::try_from(physical.end).context("Physical end exceeds address width")?;
    Ok(MemRegion::new(start, end)?)
}

#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
fn run_physical_pass(tester: &PatternTester, region: MemRegion) -> Result<MemtestReport> {
    use bringup_memtest::PhysMapping;

    // SAFETY: the operator names a range reserved for testing; the pattern
    // test owns it for the duration of the mapping.
    let mut mapping = unsafe { PhysMapping::open(region) }
        .with_context(|| format!("Failed to map physical region {region}"))?;
    let mut bus = mapping.bus();
    Ok(tester.run(&mut bus, region))
}

#[cfg(not(target_os = "linux"))]
fn run_physical_pass(_tester: &PatternTester, region: MemRegion) -> Result<MemtestReport> {
    bail!("physical region {region} requested, but /dev/mem is only supported on Linux")
}

#[cfg(target_os = "linux")]
fn lock_memory() -> Result<()> {
    use nix::sys::mman::{mlockall, MlockAllFlags};

    debug!("Locking memory pages with mlockall");

    match mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE) {
        Ok(()) => {
            info!("Memory locked");
            Ok(())
        }
        Err(nix::errno::Errno::EPERM) => {
            warn!("mlockall failed with EPERM, testing without CAP_IPC_LOCK; pages may be swapped");
            Ok(())
        }
        Err(e) => Err(e).context("mlockall failed"),
    }
}

#[cfg(not(target_os = "linux"))]
fn lock_memory() -> Result<()> {
    warn!("Memory locking not supported on this platform");
    Ok(())
}

fn run_delay(config: &BringupConfig, usec: u64) -> Result<()> {
    let requested = Duration::from_micros(usec);
    if requested > config.timer.max_delay {
        bail!(
            "delay of {} exceeds timer.max_delay of {}",
            humantime::format_duration(requested),
            humantime::format_duration(config.timer.max_delay)
        );
    }

    let counter = HostCounter::from_config(&config.timer).context("Invalid timer configuration")?;
    let mut timer =
        MonotonicTimer::from_config(counter, &config.timer).context("Invalid timer configuration")?;

    let wrap_period = config.timer.wrap_period().context("Invalid timer configuration")?;
    info!(
        tick_rate_hz = timer.tick_rate(),
        counter_bits = config.timer.counter_bits,
        wrap_period = %humantime::format_duration(wrap_period),
        "Host counter ready"
    );

    let wall = Instant::now();
    let base = timer.elapsed_ticks();
    let requested_ticks = timer.delay_us(usec);
    let observed_ticks = timer.elapsed_since(base);
    let wall = wall.elapsed();

    info!(
        usec,
        requested_ticks,
        observed_ticks,
        wall = %humantime::format_duration(wall),
        "Delay complete"
    );

    if observed_ticks < requested_ticks {
        bail!("delay returned after {observed_ticks} ticks, expected at least {requested_ticks}");
    }
    Ok(())
}
