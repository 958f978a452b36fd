// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Undecorated text report, suitable for mail and log files

use std::io::{self, Write};

use chrono::{DateTime, Local};

use super::RULE_WIDTH;
use crate::analyzer::DeviceReport;

/// Ranked drives with their issues, no colors or symbols
pub fn render_plain(
    out: &mut impl Write,
    reports: &[DeviceReport],
    generated: DateTime<Local>,
) -> io::Result<()> {
    writeln!(
        out,
        "Disk Health Check Report - {}",
        generated.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;

    let ranked = super::ranked(reports);

    for (i, report) in ranked.iter().enumerate() {
        let device = &report.device;
        writeln!(out)?;
        writeln!(out, "#{} /dev/{} - {} ({})", i + 1, device.name, device.model, device.size)?;
        writeln!(out, "   Score: {}", report.score())?;
        match report.facts.smart_health {
            Some(health) => writeln!(out, "   SMART: {}", health)?,
            None => writeln!(out, "   SMART: not checked")?,
        }
        if let Some(temp) = report.facts.temperature {
            writeln!(out, "   Temperature: {}°C", temp)?;
        }
        if let Some(usage) = report.facts.usage {
            writeln!(out, "   Usage: {}%", usage)?;
        }

        if !report.facts.partitions.is_empty() {
            writeln!(out, "   Partitions:")?;
            for p in &report.facts.partitions {
                let status = if p.is_mounted { "mounted" } else { "unmounted" };
                writeln!(out, "      - {} ({}) - {}", p.name, p.fstype_or_unknown(), status)?;
                match (&p.mountpoint, p.usage, &p.fs_checks) {
                    (Some(mountpoint), Some(usage), _) if p.is_mounted => {
                        writeln!(out, "        Usage: {}% at {}", usage, mountpoint)?;
                    }
                    (_, _, Some(checks)) if !p.is_mounted => {
                        if let Some(state) = &checks.state {
                            writeln!(out, "        State: {}", state)?;
                        }
                    }
                    _ => {}
                }
            }
        }

        if !report.issues().is_empty() {
            writeln!(out, "   Issues:")?;
            for issue in report.issues() {
                writeln!(out, "      [{}] {}", issue.severity, issue.message)?;
            }
        }
    }

    Ok(())
}
