// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Report rendering
//!
//! Three renderers share one [`ReportContext`]: the colored console report,
//! a plain text report for logs and mail, and a JSON document for
//! monitoring systems. Renderers write to any [`std::io::Write`] and never
//! touch global color state; the [`Style`] is chosen once and passed in.

pub mod console;
pub mod json;
pub mod plain;

use std::cmp::Reverse;

use colored::Colorize;

use crate::analyzer::DeviceReport;
use crate::config::HealthConfig;
use crate::tools::EnvironmentInfo;

pub use console::{render_console, render_header};
pub use json::{render_json, JsonReport};
pub use plain::render_plain;

/// Crate version reported in headers and JSON
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Width of the `═` rules framing console sections
pub(crate) const RULE_WIDTH: usize = 60;

/// Presentation style, selected once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// ANSI colors and Unicode symbols
    Rich,
    /// No escape codes, ASCII symbols
    Plain,
}

/// Semantic color of a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Header,
    Blue,
    Cyan,
    Ok,
    Warning,
    Fail,
}

impl Style {
    pub fn symbols(self) -> Symbols {
        match self {
            Style::Rich => Symbols::UNICODE,
            Style::Plain => Symbols::ASCII,
        }
    }

    pub fn paint(self, text: &str, tone: Tone) -> String {
        match self {
            Style::Plain => text.to_string(),
            Style::Rich => match tone {
                Tone::Header => text.magenta().to_string(),
                Tone::Blue => text.blue().to_string(),
                Tone::Cyan => text.cyan().to_string(),
                Tone::Ok => text.green().to_string(),
                Tone::Warning => text.yellow().to_string(),
                Tone::Fail => text.red().to_string(),
            },
        }
    }

    pub fn bold(self, text: &str) -> String {
        match self {
            Style::Plain => text.to_string(),
            Style::Rich => text.bold().to_string(),
        }
    }

    /// Colored and bold
    pub fn strong(self, text: &str, tone: Tone) -> String {
        match self {
            Style::Plain => text.to_string(),
            Style::Rich => self.paint(text, tone).bold().to_string(),
        }
    }
}

/// Status glyphs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbols {
    pub ok: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
    pub info: &'static str,
    pub disk: &'static str,
    pub temp: &'static str,
    pub clock: &'static str,
    pub unmounted: &'static str,
}

impl Symbols {
    pub const UNICODE: Symbols = Symbols {
        ok: "✓",
        warning: "⚠",
        error: "✗",
        info: "ℹ",
        disk: "💾",
        temp: "🌡️",
        clock: "⏱️",
        unmounted: "⏏️",
    };

    pub const ASCII: Symbols = Symbols {
        ok: "[OK]",
        warning: "[!]",
        error: "[X]",
        info: "[i]",
        disk: "[D]",
        temp: "[T]",
        clock: "[>]",
        unmounted: "[U]",
    };
}

/// Run-wide facts the renderers need besides the drive reports
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub config: HealthConfig,
    pub style: Style,
    pub is_root: bool,
    pub debug: bool,
    pub quiet: bool,
    /// Suppress recommendations
    pub check_only: bool,
    /// Optional tools that could not be resolved
    pub missing_tools: Vec<String>,
    pub environment: Option<EnvironmentInfo>,
    /// Shown in the "run with sudo" hint
    pub command_line: String,
}

impl ReportContext {
    pub fn new(config: HealthConfig, style: Style) -> Self {
        Self {
            config,
            style,
            is_root: false,
            debug: false,
            quiet: false,
            check_only: false,
            missing_tools: Vec::new(),
            environment: None,
            command_line: String::new(),
        }
    }

    pub fn is_missing(&self, tool: &str) -> bool {
        self.missing_tools.iter().any(|t| t == tool)
    }
}

/// Worst first. Stable, so equal scores keep completion order.
pub fn ranked(reports: &[DeviceReport]) -> Vec<&DeviceReport> {
    let mut ranked: Vec<&DeviceReport> = reports.iter().collect();
    ranked.sort_by_key(|r| Reverse(r.score()));
    ranked
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::time::Duration;

    use crate::analyzer::DeviceReport;
    use crate::config::HealthConfig;
    use crate::devices::{Device, MountUsage, Partition};
    use crate::extract::{FilesystemChecks, SmartAttributes, SmartHealth};
    use crate::scoring::{score, DeviceFacts};

    pub fn report(name: &str, facts: DeviceFacts, mount_points: Vec<MountUsage>) -> DeviceReport {
        let assessment = score(&facts, &HealthConfig::default().thresholds);
        DeviceReport {
            device: Device {
                name: name.to_string(),
                model: format!("Model {}", name),
                size: "1T".into(),
                rotational: true,
            },
            facts,
            mount_points,
            io_stats: None,
            assessment,
            scan_time: Duration::from_millis(250),
        }
    }

    /// Failed SMART, hot, nearly full, with a dirty unmounted ext4
    pub fn failing() -> DeviceReport {
        let mut attrs = SmartAttributes::new();
        attrs.insert("Reallocated_Sectors".into(), 4);
        let root = Partition {
            name: "sda1".into(),
            fstype: Some("ext4".into()),
            mountpoint: Some("/".into()),
            is_mounted: true,
            usage: Some(97),
            total: Some("100.0 GB".into()),
            used: Some("97.0 GB".into()),
            free: Some("3.0 GB".into()),
            ..Partition::default()
        };
        let archive = Partition {
            name: "sda2".into(),
            fstype: Some("ext4".into()),
            label: Some("archive".into()),
            total: Some("800G".into()),
            fs_checks: Some(FilesystemChecks {
                state: Some("not".into()),
                clean: Some(false),
                last_checked: Some("Tue Mar  5 10:12:44 2024".into()),
                ..FilesystemChecks::supported()
            }),
            ..Partition::default()
        };
        let facts = DeviceFacts {
            smart_health: Some(SmartHealth::Failed),
            smart_attrs: attrs,
            temperature: Some(63),
            usage: Some(97),
            partitions: vec![root, archive],
        };
        let mount = MountUsage {
            mountpoint: "/".into(),
            usage: 97,
            total: "100.0 GB".into(),
            used: "97.0 GB".into(),
            free: "3.0 GB".into(),
        };
        report("sda", facts, vec![mount])
    }

    pub fn healthy() -> DeviceReport {
        let facts = DeviceFacts {
            smart_health: Some(SmartHealth::Passed),
            temperature: Some(34),
            ..DeviceFacts::default()
        };
        report("sdb", facts, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_style_has_no_escapes() {
        let style = Style::Plain;
        assert_eq!(style.paint("x", Tone::Fail), "x");
        assert_eq!(style.strong("x", Tone::Ok), "x");
        assert_eq!(style.symbols().ok, "[OK]");
    }

    #[test]
    fn test_rich_style_symbols() {
        assert_eq!(Style::Rich.symbols().warning, "⚠");
    }

    #[test]
    fn test_ranked_worst_first() {
        let reports = vec![fixtures::healthy(), fixtures::failing()];
        let ranked = ranked(&reports);
        assert_eq!(ranked[0].device.name, "sda");
        assert!(ranked[0].score() > ranked[1].score());
        assert_eq!(reports[0].device.name, "sdb");
    }
}
