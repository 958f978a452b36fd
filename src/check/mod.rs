// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! One complete health check run
//!
//! Dependency check, drive discovery, parallel analysis, rendering and the
//! process exit status, in the order the `dhc` binary performs them. Output
//! goes to any [`Write`]; commands go through the supplied executor.

use std::io::Write;
use std::sync::Arc;

use crate::analyzer::{AnalysisScope, DiskAnalyzer, ProgressObserver};
use crate::config::HealthConfig;
use crate::devices::list_devices;
use crate::error::{HealthError, Result};
use crate::report::{self, ReportContext, Style, Tone};
use crate::runner::CommandExecutor;
use crate::scoring::DeviceClass;
use crate::tools::ToolLocator;

/// No drive classified as critical
pub const EXIT_OK: u8 = 0;
/// Missing required tool, no drives, or a runtime error
pub const EXIT_FAILURE: u8 = 1;
/// At least one drive classified as critical
pub const EXIT_CRITICAL: u8 = 2;

/// Report flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Console,
    Plain,
    Json,
}

/// Per-run switches, usually taken from the command line
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub format: OutputFormat,
    pub scope: AnalysisScope,
    pub check_only: bool,
    pub debug: bool,
    pub quiet: bool,
    pub is_root: bool,
    /// Shown in the "run with sudo" hint
    pub command_line: String,
}

impl CheckOptions {
    pub fn style(&self) -> Style {
        match self.format {
            OutputFormat::Console => Style::Rich,
            OutputFormat::Plain | OutputFormat::Json => Style::Plain,
        }
    }

    /// Progress chatter only accompanies the human readable reports
    pub fn chatty(&self) -> bool {
        self.format != OutputFormat::Json && !self.quiet
    }
}

/// Run a full check and return the process exit status.
///
/// A missing required tool or an empty drive listing ends the run with
/// [`EXIT_FAILURE`] before any drive is analyzed.
pub async fn run_check(
    out: &mut impl Write,
    exec: Arc<dyn CommandExecutor>,
    locator: Arc<ToolLocator>,
    config: Arc<HealthConfig>,
    options: &CheckOptions,
    progress: &dyn ProgressObserver,
) -> Result<u8> {
    let style = options.style();
    let chatty = options.chatty();

    let deps = locator.check_dependencies();
    if !deps.is_satisfied() {
        let err = HealthError::DependencyMissing(deps.missing.clone());
        log::error!("{}", err);
        writeln!(out, "{}", style.paint(&err.to_string(), Tone::Fail))?;
        writeln!(out, "Please install the missing tools and try again.")?;
        return Ok(EXIT_FAILURE);
    }

    if !deps.optional.is_empty() && chatty {
        render_optional_notice(out, &deps.optional, style)?;
    }

    if chatty {
        report::render_header(out, style)?;
        writeln!(out, "{}", style.bold("Searching for drives..."))?;
    }

    let devices = list_devices(exec.as_ref()).await;
    if devices.is_empty() {
        writeln!(out, "{}", style.paint(&format!("{}!", HealthError::NoDevices), Tone::Fail))?;
        return Ok(EXIT_FAILURE);
    }

    if chatty {
        writeln!(out, "Found: {} drive(s)", devices.len())?;
        writeln!(out)?;
        write!(out, "{}", style.bold("Analyzing drives"))?;
    }
    out.flush()?;

    let analyzer = Arc::new(
        DiskAnalyzer::new(exec, Arc::clone(&locator), Arc::clone(&config)).with_scope(options.scope),
    );
    let reports = analyzer.analyze_all(devices, progress).await;

    if chatty {
        writeln!(out, " {}", style.paint(style.symbols().ok, Tone::Ok))?;
    }

    let json = options.format == OutputFormat::Json;
    let ctx = ReportContext {
        config: config.as_ref().clone(),
        style,
        is_root: options.is_root,
        debug: options.debug,
        quiet: options.quiet,
        check_only: options.check_only,
        missing_tools: deps.optional.clone(),
        environment: (options.debug || json).then(|| locator.environment_info()),
        command_line: options.command_line.clone(),
    };

    match options.format {
        OutputFormat::Json => report::render_json(out, &reports, &ctx)?,
        OutputFormat::Plain => report::render_plain(out, &reports, chrono::Local::now())?,
        OutputFormat::Console => report::render_console(out, &reports, &ctx)?,
    }
    out.flush()?;

    let critical = reports
        .iter()
        .any(|r| r.class(&config) == DeviceClass::Critical);
    Ok(if critical { EXIT_CRITICAL } else { EXIT_OK })
}

fn render_optional_notice(out: &mut impl Write, missing: &[String], style: Style) -> Result<()> {
    writeln!(
        out,
        "{}",
        style.paint(
            &format!("Optional tools not found: {}", missing.join(", ")),
            Tone::Warning
        )
    )?;
    writeln!(out, "For full functionality install:")?;
    if missing.iter().any(|t| t == "smartctl") {
        writeln!(out, "  {} (Debian/Ubuntu)", style.paint("sudo apt install smartmontools", Tone::Ok))?;
        writeln!(out, "  {} (RedHat/CentOS)", style.paint("sudo yum install smartmontools", Tone::Ok))?;
    }
    if missing.iter().any(|t| t == "blkid") {
        writeln!(out, "  {} (filesystem detection)", style.paint("sudo apt install util-linux", Tone::Ok))?;
    }
    writeln!(out)?;
    Ok(())
}
