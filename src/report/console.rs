// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Human oriented console report

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

use super::{ReportContext, Style, Tone, RULE_WIDTH, VERSION};
use crate::analyzer::DeviceReport;
use crate::devices::Partition;
use crate::extract::{fsck_command, SmartHealth};
use crate::scoring::{DeviceClass, Severity};

fn rule() -> String {
    "═".repeat(RULE_WIDTH)
}

/// Banner printed before drive discovery
pub fn render_header(out: &mut impl Write, style: Style) -> io::Result<()> {
    let line = "═".repeat(63);
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(out)?;
    writeln!(out, "{}", style.strong(&line, Tone::Header))?;
    writeln!(out, "{}", style.strong(&format!("   Disk Health Checker v{}", VERSION), Tone::Header))?;
    writeln!(out, "{}", style.strong(&format!("   {}", now), Tone::Header))?;
    writeln!(out, "{}", style.strong(&line, Tone::Header))?;
    writeln!(out)
}

/// Full console report: ranked drives, recommendations, summary
pub fn render_console(
    out: &mut impl Write,
    reports: &[DeviceReport],
    ctx: &ReportContext,
) -> io::Result<()> {
    let style = ctx.style;
    let symbols = style.symbols();

    if ctx.debug {
        render_environment(out, ctx)?;
    }

    if !ctx.is_root && !ctx.quiet {
        writeln!(
            out,
            "{}",
            style.paint(
                &format!("{} Note: Running without root privileges.", symbols.warning),
                Tone::Warning
            )
        )?;
        writeln!(out, "   Some tests (SMART, temperature, unmounted filesystems) require root access.")?;
        writeln!(out, "   Run with sudo for complete analysis.")?;
        writeln!(out)?;
    }

    let ranked = super::ranked(reports);

    writeln!(out)?;
    writeln!(out, "{}", style.bold(&rule()))?;
    writeln!(out, "{}", style.bold("Results (sorted by urgency):"))?;
    writeln!(out, "{}", style.bold(&rule()))?;
    writeln!(out)?;

    for (i, report) in ranked.iter().enumerate() {
        render_disk(out, i + 1, report, ctx)?;
    }

    render_recommendations(out, &ranked, ctx)?;
    render_summary(out, &ranked, ctx)
}

fn render_environment(out: &mut impl Write, ctx: &ReportContext) -> io::Result<()> {
    let Some(env) = &ctx.environment else {
        return Ok(());
    };
    let style = ctx.style;
    writeln!(out, "{}", style.strong("DEBUG: Environment information", Tone::Cyan))?;
    writeln!(out, "  USER: {}", env.user)?;
    let path: String = env.path.chars().take(100).collect();
    let ellipsis = if env.path.chars().count() > 100 { "..." } else { "" };
    writeln!(out, "  PATH: {}{}", path, ellipsis)?;
    writeln!(out, "  Systemd: {}", env.is_systemd)?;
    writeln!(out, "  Cron/Non-TTY: {}", env.is_cron)?;
    writeln!(out, "  Tool paths found:")?;
    for (tool, path) in &env.tool_paths {
        writeln!(out, "    {}: {}", tool, path.display())?;
    }
    writeln!(out)
}

fn status_tone(score: u64, ctx: &ReportContext) -> (Tone, &'static str) {
    let symbols = ctx.style.symbols();
    match DeviceClass::classify(score, &ctx.config.thresholds) {
        DeviceClass::Critical => (Tone::Fail, symbols.error),
        DeviceClass::Warning => (Tone::Warning, symbols.warning),
        DeviceClass::Ok if score > 0 => (Tone::Cyan, symbols.info),
        DeviceClass::Ok => (Tone::Ok, symbols.ok),
    }
}

fn render_disk(
    out: &mut impl Write,
    rank: usize,
    report: &DeviceReport,
    ctx: &ReportContext,
) -> io::Result<()> {
    let style = ctx.style;
    let symbols = style.symbols();
    let thresholds = &ctx.config.thresholds;
    let (tone, status) = status_tone(report.score(), ctx);
    let device = &report.device;

    writeln!(
        out,
        "{}",
        style.strong(
            &format!("#{} - /dev/{} - {} ({})", rank, device.name, device.model, device.size),
            tone
        )
    )?;
    writeln!(
        out,
        "   Status: {}",
        style.paint(&format!("{} Score: {}", status, report.score()), tone)
    )?;

    if let Some(temp) = report.facts.temperature {
        let tone = if temp > thresholds.temp_warning {
            Tone::Fail
        } else {
            Tone::Ok
        };
        writeln!(
            out,
            "   {} Temperature: {}",
            symbols.temp,
            style.paint(&format!("{}°C", temp), tone)
        )?;
    }

    if let Some(usage) = report.facts.usage {
        let tone = if usage >= thresholds.usage_warning {
            Tone::Fail
        } else if usage >= thresholds.usage_info {
            Tone::Warning
        } else {
            Tone::Ok
        };
        writeln!(
            out,
            "   {} Usage: {}",
            symbols.disk,
            style.paint(&format!("{}%", usage), tone)
        )?;
        for mp in report.mount_points.iter().take(ctx.config.output.max_mount_points_shown) {
            writeln!(
                out,
                "      └─ {}: {}% ({}/{})",
                mp.mountpoint, mp.usage, mp.used, mp.total
            )?;
        }
    }

    if ctx.config.output.show_unmounted {
        let unmounted: Vec<&Partition> =
            report.facts.partitions.iter().filter(|p| !p.is_mounted).collect();
        if !unmounted.is_empty() {
            writeln!(out, "   {} Unmounted partitions:", symbols.unmounted)?;
            for part in unmounted {
                render_unmounted(out, part, ctx)?;
            }
        }
    }

    if let Some(io) = report.io_stats.filter(|_| ctx.config.output.show_io_stats) {
        writeln!(
            out,
            "   {} I/O: {} reads, {} writes",
            symbols.clock,
            thousands(io.read_ios),
            thousands(io.write_ios)
        )?;
    }

    if ctx.debug {
        writeln!(out, "   Scan time: {:.2}s", report.scan_time.as_secs_f64())?;
    }

    if !report.issues().is_empty() {
        writeln!(out, "   {} Found issues:", symbols.warning)?;
        for issue in report.issues() {
            let tone = match issue.severity {
                Severity::Critical => Tone::Fail,
                Severity::Warning => Tone::Warning,
                Severity::Info => Tone::Cyan,
            };
            writeln!(out, "      {}", style.paint(&format!("• {}", issue.message), tone))?;
        }
    }

    writeln!(out)
}

fn render_unmounted(out: &mut impl Write, part: &Partition, ctx: &ReportContext) -> io::Result<()> {
    let style = ctx.style;
    let fs = part.fstype.as_deref().unwrap_or("Unknown FS");
    let label = part
        .label
        .as_deref()
        .map(|l| format!(" [{}]", l))
        .unwrap_or_default();
    writeln!(
        out,
        "      └─ {}: {}{} ({})",
        part.name,
        fs,
        label,
        part.total.as_deref().unwrap_or("Unknown")
    )?;

    let mut suggest_fsck = false;
    if let Some(checks) = &part.fs_checks {
        if checks.is_unclean() {
            let state = checks.state.as_deref().unwrap_or_default();
            writeln!(
                out,
                "         {}",
                style.paint(&format!("State: {} - needs checking", state), Tone::Warning)
            )?;
            suggest_fsck = true;
        } else if checks.needs_check() {
            writeln!(
                out,
                "         {}",
                style.paint(&mount_count_note("Check recommended", part), Tone::Warning)
            )?;
            suggest_fsck = true;
        }
        if let Some(last) = &checks.last_checked {
            writeln!(out, "         Last checked: {}", last)?;
        }
    }

    if suggest_fsck {
        if let Some(cmd) = part.fstype.as_deref().and_then(|fs| fsck_command(&part.name, fs, true)) {
            writeln!(out, "         {}", style.paint(&format!("→ {}", cmd), Tone::Ok))?;
        }
    }
    Ok(())
}

fn mount_count_note(prefix: &str, part: &Partition) -> String {
    let checks = part.fs_checks.as_ref();
    let count = checks.and_then(|c| c.mount_count).unwrap_or_default();
    let max = checks.and_then(|c| c.max_mount_count).unwrap_or_default();
    format!("{} (mount count: {}/{})", prefix, count, max)
}

fn render_recommendations(
    out: &mut impl Write,
    ranked: &[&DeviceReport],
    ctx: &ReportContext,
) -> io::Result<()> {
    let style = ctx.style;
    let thresholds = &ctx.config.thresholds;
    writeln!(out)?;
    writeln!(out, "{}", style.bold(&format!("{} Recommendations:", style.symbols().info)))?;
    writeln!(out)?;

    let class = |r: &DeviceReport| DeviceClass::classify(r.score(), thresholds);
    let critical: Vec<&DeviceReport> = ranked
        .iter()
        .copied()
        .filter(|r| class(r) == DeviceClass::Critical)
        .collect();
    let warning: Vec<&DeviceReport> = ranked
        .iter()
        .copied()
        .filter(|r| class(r) == DeviceClass::Warning)
        .collect();
    let unclean: Vec<(&DeviceReport, &Partition)> = ranked
        .iter()
        .copied()
        .flat_map(|r| {
            r.facts
                .partitions
                .iter()
                .filter(|p| !p.is_mounted && p.fs_checks.as_ref().is_some_and(|c| c.is_unclean()))
                .map(move |p| (r, p))
        })
        .collect();

    if !critical.is_empty() {
        writeln!(out, "{}", style.strong("CRITICAL - Immediate action required:", Tone::Fail))?;
        for disk in critical {
            writeln!(out, "  {}", style.paint(&format!("• /dev/{}:", disk.device.name), Tone::Fail))?;
            if disk.facts.smart_health == Some(SmartHealth::Failed) {
                writeln!(out, "    → IMMEDIATELY create backup! Drive is about to fail!")?;
            }
            if disk.facts.usage.is_some_and(|u| u >= thresholds.usage_critical) {
                writeln!(out, "    → Urgently free up disk space or migrate data!")?;
            }
            if disk.facts.temperature.is_some_and(|t| t > thresholds.temp_critical) {
                writeln!(out, "    → Check cooling! Drive is overheating!")?;
            }
        }
        writeln!(out)?;
    }

    if !warning.is_empty() {
        writeln!(out, "{}", style.strong("WARNING - Attention required:", Tone::Warning))?;
        for disk in warning {
            writeln!(out, "  {}", style.paint(&format!("• /dev/{}:", disk.device.name), Tone::Warning))?;
            for issue in disk.issues().iter().filter(|i| i.severity == Severity::Warning) {
                writeln!(out, "    → {}", issue.message)?;
            }
        }
        writeln!(out)?;
    }

    if !unclean.is_empty() {
        writeln!(out, "{}", style.strong("Unmounted filesystem issues:", Tone::Warning))?;
        for (disk, part) in unclean {
            writeln!(
                out,
                "  {}",
                style.paint(
                    &format!("• /dev/{} on disk {}:", part.name, disk.device.name),
                    Tone::Warning
                )
            )?;
            if let Some(label) = &part.label {
                writeln!(out, "    Label: {}", label)?;
            }
            writeln!(out, "    Filesystem: {}", part.fstype_or_unknown())?;
            if let Some(state) = part.fs_checks.as_ref().and_then(|c| c.state.as_deref()) {
                writeln!(out, "    → Filesystem needs checking (state: {})", state)?;
            }
            let fstype = part.fstype_or_unknown();
            if let Some(cmd) = fsck_command(&part.name, fstype, true) {
                writeln!(out, "    Command to check:")?;
                writeln!(out, "      {}", style.paint(&cmd, Tone::Ok))?;
                let note = match fstype {
                    "xfs" => Some("Note: For XFS, use without -n flag to repair"),
                    "btrfs" => Some("Note: For btrfs, add --repair only if needed"),
                    "ntfs" => Some("Note: For NTFS, consider using Windows chkdsk for thorough repair"),
                    _ => None,
                };
                if let Some(note) = note {
                    writeln!(out, "      {}", style.paint(note, Tone::Cyan))?;
                }
            }
        }
        writeln!(out)?;
    }

    let missing: Vec<&str> = ["smartctl", "blkid"]
        .into_iter()
        .filter(|t| ctx.is_missing(t))
        .collect();
    if !missing.is_empty() && !ctx.quiet {
        writeln!(out, "{}", style.strong("Missing optional tools:", Tone::Warning))?;
        writeln!(out, "  Install for extended functionality:")?;
        if missing.contains(&"smartctl") {
            writeln!(out, "    {} (for SMART tests)", style.paint("sudo apt install smartmontools", Tone::Ok))?;
        }
        if missing.contains(&"blkid") {
            writeln!(out, "    {} (for filesystem detection)", style.paint("sudo apt install util-linux", Tone::Ok))?;
        }
        writeln!(out)?;
    }

    if !ctx.is_root && !ctx.quiet {
        writeln!(out, "{}", style.strong("Note:", Tone::Cyan))?;
        writeln!(out, "  • For complete analysis including unmounted filesystems run with sudo:")?;
        writeln!(out, "    {}", style.paint(&format!("sudo {}", ctx.command_line), Tone::Ok))?;
        writeln!(out)?;
    }

    if ctx.check_only {
        return Ok(());
    }
    render_maintenance(out, ranked, ctx)
}

fn render_maintenance(
    out: &mut impl Write,
    ranked: &[&DeviceReport],
    ctx: &ReportContext,
) -> io::Result<()> {
    let style = ctx.style;
    writeln!(out, "{}", style.strong("Regular maintenance:", Tone::Blue))?;
    writeln!(out, "  • Run this check monthly")?;
    writeln!(out, "  • Create regular backups of important data")?;
    writeln!(out, "  • Monitor temperature under high load")?;
    writeln!(out, "  • Keep at least 10-20% free disk space")?;
    writeln!(out, "  • Check and mount/repair unmounted filesystems if needed")?;

    // First unmounted partition of each filesystem type, by type name
    let mut by_type: BTreeMap<&str, &Partition> = BTreeMap::new();
    let mut any_unmounted = false;
    let unmounted = ranked
        .iter()
        .copied()
        .flat_map(|r| &r.facts.partitions)
        .filter(|p| !p.is_mounted);
    for part in unmounted {
        any_unmounted = true;
        if let Some(fs) = part.fstype.as_deref() {
            by_type.entry(fs).or_insert(part);
        }
    }
    if !any_unmounted {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "{}", style.strong("Filesystem check commands:", Tone::Blue))?;
    writeln!(out, "  Common fsck commands for different filesystems:")?;
    for (fstype, part) in by_type {
        let Some(cmd) = fsck_command(&part.name, fstype, false) else {
            continue;
        };
        writeln!(out, "  • {}: {}", fstype, style.paint(&cmd, Tone::Ok))?;
        let tips: &[&str] = match fstype {
            "ext2" | "ext3" | "ext4" => &[
                "Use -f to force check even if filesystem seems clean",
                "Use -y to automatically fix errors (use with caution)",
            ],
            "xfs" => &[
                "Use without -n to actually repair (default is check-only)",
                "XFS is self-healing and rarely needs manual repair",
            ],
            "btrfs" => &[
                "Add --repair only if check reports errors",
                "Consider 'btrfs scrub' for online checking",
            ],
            "ntfs" => &[
                "Limited repair capability on Linux",
                "For thorough repair, use Windows chkdsk",
            ],
            _ => &[],
        };
        for tip in tips {
            writeln!(out, "    {}", tip)?;
        }
    }
    writeln!(out)?;
    writeln!(
        out,
        "  {}",
        style.paint(
            &format!("{} Always ensure partitions are unmounted before running fsck!", style.symbols().warning),
            Tone::Warning
        )
    )?;
    writeln!(
        out,
        "  {}",
        style.paint("Tip: Boot from a live USB/CD for checking root partition", Tone::Cyan)
    )
}

fn render_summary(
    out: &mut impl Write,
    ranked: &[&DeviceReport],
    ctx: &ReportContext,
) -> io::Result<()> {
    let style = ctx.style;
    let thresholds = &ctx.config.thresholds;
    let count = |class| {
        ranked
            .iter()
            .filter(|r| DeviceClass::classify(r.score(), thresholds) == class)
            .count()
    };
    let critical = count(DeviceClass::Critical);
    let warning = count(DeviceClass::Warning);
    let ok = count(DeviceClass::Ok);

    writeln!(out)?;
    writeln!(out, "{}", style.bold(&rule()))?;
    writeln!(out, "{}", style.bold("Summary:"))?;
    let tone_if = |n: usize, tone| if n > 0 { tone } else { Tone::Ok };
    writeln!(out, "  {}", style.paint(&format!("• Critical: {}", critical), tone_if(critical, Tone::Fail)))?;
    writeln!(out, "  {}", style.paint(&format!("• Warning:  {}", warning), tone_if(warning, Tone::Warning)))?;
    writeln!(out, "  {}", style.paint(&format!("• OK:       {}", ok), Tone::Ok))?;

    let total: usize = ranked.iter().map(|r| r.facts.partitions.len()).sum();
    let unmounted: usize = ranked
        .iter()
        .map(|r| r.facts.partitions.iter().filter(|p| !p.is_mounted).count())
        .sum();
    if total > 0 {
        writeln!(out)?;
        writeln!(out, "{}", style.bold("Partitions:"))?;
        writeln!(out, "  • Total:     {}", total)?;
        writeln!(out, "  • Mounted:   {}", total - unmounted)?;
        writeln!(out, "  • Unmounted: {}", unmounted)?;
    }

    let scan_time: Duration = ranked.iter().map(|r| r.scan_time).sum();
    writeln!(out)?;
    writeln!(out, "Total scan time: {:.2}s", scan_time.as_secs_f64())?;
    writeln!(out, "{}", style.bold(&rule()))?;
    writeln!(out)
}

/// `1234567` as `1,234,567`
fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
