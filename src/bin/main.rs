// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! CLI tool for Disk Health Checker (dhc)

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use dhclib::analyzer::{AnalysisScope, DeviceReport, ProgressObserver};
#[cfg(feature = "cli")]
use dhclib::check::{run_check, CheckOptions, OutputFormat};
#[cfg(feature = "cli")]
use dhclib::config::HealthConfig;
#[cfg(feature = "cli")]
use dhclib::report::{Style, Tone};
#[cfg(feature = "cli")]
use dhclib::{CommandRunner, HealthError, ToolLocator};
#[cfg(feature = "cli")]
use std::io::Write;
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::process::ExitCode;
#[cfg(feature = "cli")]
use std::sync::Arc;

/// File written by `--create-config`
#[cfg(feature = "cli")]
const SAMPLE_CONFIG_FILE: &str = "disk_health_checker.toml";

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "dhc")]
#[command(about = "Disk Health Checker: rank physical drives by S.M.A.R.T., temperature, usage and filesystem state", long_about = None)]
#[command(version)]
#[command(after_help = "\
Examples:
  dhc                     Standard analysis with colored output
  dhc --json              JSON output for monitoring tools
  dhc --check-only        Check only, no recommendations
  dhc --smart-only        Run SMART tests only
  dhc --config my.toml    With custom configuration
  dhc --create-config     Create sample configuration

For complete SMART and filesystem analysis run with sudo:
  sudo dhc

For cron jobs use the full path:
  /usr/local/bin/dhc --json")]
struct Cli {
    /// JSON output for machine processing
    #[arg(long, conflicts_with = "plain")]
    json: bool,

    /// Simple text output without colors/symbols
    #[arg(long)]
    plain: bool,

    /// Run SMART tests only
    #[arg(long, conflicts_with = "usage_only")]
    smart_only: bool,

    /// Check disk usage only
    #[arg(long)]
    usage_only: bool,

    /// Check only, no recommendations
    #[arg(long)]
    check_only: bool,

    /// Show unmounted partitions in output
    #[arg(long)]
    show_unmounted: bool,

    /// Inspect filesystems on unmounted partitions
    #[arg(long)]
    check_unmounted: bool,

    /// Number of parallel workers (default: 4)
    #[arg(long, value_name = "N")]
    parallel: Option<usize>,

    /// Command timeout in seconds (default: 10)
    #[arg(long, value_name = "SEC")]
    timeout: Option<u64>,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Create sample configuration file
    #[arg(long)]
    create_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Debug output with all details
    #[arg(short, long)]
    debug: bool,

    /// Minimal output
    #[arg(short, long)]
    quiet: bool,
}

#[cfg(feature = "cli")]
impl Cli {
    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.plain {
            OutputFormat::Plain
        } else {
            OutputFormat::Console
        }
    }

    fn options(&self) -> CheckOptions {
        CheckOptions {
            format: self.format(),
            scope: self.scope(),
            check_only: self.check_only,
            debug: self.debug,
            quiet: self.quiet,
            is_root: dhclib::tools::is_root(),
            command_line: std::env::args().collect::<Vec<_>>().join(" "),
        }
    }

    fn style(&self) -> Style {
        match self.format() {
            OutputFormat::Console => Style::Rich,
            OutputFormat::Plain | OutputFormat::Json => Style::Plain,
        }
    }

    fn scope(&self) -> AnalysisScope {
        if self.smart_only {
            AnalysisScope::smart_only()
        } else if self.usage_only {
            AnalysisScope::usage_only()
        } else {
            AnalysisScope::default()
        }
    }

    fn apply_overrides(&self, config: &mut HealthConfig) {
        if let Some(workers) = self.parallel.filter(|n| *n > 0) {
            config.performance.max_workers = workers;
        }
        if let Some(timeout) = self.timeout.filter(|t| *t > 0) {
            config.performance.command_timeout = timeout;
        }
        if self.show_unmounted {
            config.output.show_unmounted = true;
        }
        if self.check_unmounted {
            config.filesystem.check_unmounted = true;
        }
    }
}

/// Prints one dot per analyzed drive
#[cfg(feature = "cli")]
struct DotProgress {
    enabled: bool,
}

#[cfg(feature = "cli")]
impl ProgressObserver for DotProgress {
    fn on_device_done(&self, _report: &DeviceReport) {
        if self.enabled {
            print!(".");
            let _ = std::io::stdout().flush();
        }
    }
}

#[cfg(feature = "cli")]
fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        log::LevelFilter::Debug
    } else if cli.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    let style = cli.style();

    if cli.create_config {
        return match std::fs::write(SAMPLE_CONFIG_FILE, HealthConfig::sample_toml()) {
            Ok(()) => {
                println!("Sample configuration file created: {}", SAMPLE_CONFIG_FILE);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", style.paint(&format!("Error: {}", e), Tone::Fail));
                ExitCode::FAILURE
            }
        };
    }

    let mut config = HealthConfig::load_or_default(cli.config.as_deref());
    cli.apply_overrides(&mut config);

    tokio::select! {
        result = run(&cli, config) => match result {
            Ok(code) => ExitCode::from(code),
            Err(e) => {
                let _ = report_error(&mut std::io::stdout(), &mut std::io::stderr(), &e, cli.debug, style);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("{}", style.paint("Aborted.", Tone::Warning));
            ExitCode::from(130)
        }
    }
}

/// One-line message normally, the debug form on stderr with `--debug`
#[cfg(feature = "cli")]
fn report_error(
    out: &mut impl Write,
    err: &mut impl Write,
    e: &HealthError,
    debug: bool,
    style: Style,
) -> std::io::Result<()> {
    writeln!(out)?;
    if debug {
        writeln!(err, "{:?}", e)
    } else {
        writeln!(out, "{}", style.paint(&format!("Error: {}", e), Tone::Fail))
    }
}

#[cfg(feature = "cli")]
async fn run(cli: &Cli, config: HealthConfig) -> dhclib::Result<u8> {
    let config = Arc::new(config);
    let locator = Arc::new(ToolLocator::from_config(&config.tools));
    let runner = Arc::new(CommandRunner::new(
        Arc::clone(&locator),
        config.performance.command_timeout(),
    ));
    let options = cli.options();
    let progress = DotProgress {
        enabled: options.chatty(),
    };
    run_check(
        &mut std::io::stdout(),
        runner,
        locator,
        config,
        &options,
        &progress,
    )
    .await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features not enabled. Please compile with --features cli");
    std::process::exit(1);
}
