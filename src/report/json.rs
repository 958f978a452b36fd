// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Machine readable JSON report

use std::io::Write;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::{ReportContext, VERSION};
use crate::analyzer::DeviceReport;
use crate::devices::MountUsage;
use crate::extract::{fsck_command, FilesystemChecks, IoStats, SmartAttributes, SmartHealth};
use crate::scoring::Issue;
use crate::tools::EnvironmentInfo;

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub version: &'static str,
    pub timestamp: String,
    pub is_root: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<&'a EnvironmentInfo>,
    pub disks: Vec<JsonDisk<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JsonDisk<'a> {
    pub name: &'a str,
    pub path: String,
    pub model: &'a str,
    pub size: &'a str,
    pub score: u64,
    pub smart: JsonSmart<'a>,
    pub temperature: Option<i64>,
    pub usage: JsonUsage<'a>,
    pub partitions: Vec<JsonPartition<'a>>,
    pub issues: &'a [Issue],
    /// Seconds
    pub scan_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_stats: Option<IoStats>,
}

#[derive(Debug, Serialize)]
pub struct JsonSmart<'a> {
    pub health: Option<SmartHealth>,
    pub attributes: &'a SmartAttributes,
}

#[derive(Debug, Serialize)]
pub struct JsonUsage<'a> {
    pub percent: Option<u32>,
    pub mount_points: &'a [MountUsage],
}

#[derive(Debug, Serialize)]
pub struct JsonPartition<'a> {
    pub name: &'a str,
    pub fstype: Option<&'a str>,
    pub mountpoint: Option<&'a str>,
    pub is_mounted: bool,
    pub usage: Option<u32>,
    pub uuid: Option<&'a str>,
    pub label: Option<&'a str>,
    pub total: Option<&'a str>,
    /// `{}` when the partition was not inspected
    #[serde(serialize_with = "checks_or_empty")]
    pub fs_checks: Option<&'a FilesystemChecks>,
    /// Suggested check for unmounted partitions with a known filesystem
    pub fsck_command: Option<String>,
}

impl<'a> JsonReport<'a> {
    pub fn new(reports: &'a [DeviceReport], ctx: &'a ReportContext) -> Self {
        Self {
            version: VERSION,
            timestamp: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            is_root: ctx.is_root,
            environment: ctx.environment.as_ref(),
            disks: reports.iter().map(JsonDisk::from_report).collect(),
        }
    }
}

impl<'a> JsonDisk<'a> {
    fn from_report(report: &'a DeviceReport) -> Self {
        let facts = &report.facts;
        Self {
            name: &report.device.name,
            path: format!("/dev/{}", report.device.name),
            model: &report.device.model,
            size: &report.device.size,
            score: report.score(),
            smart: JsonSmart {
                health: facts.smart_health,
                attributes: &facts.smart_attrs,
            },
            temperature: facts.temperature,
            usage: JsonUsage {
                percent: facts.usage,
                mount_points: &report.mount_points,
            },
            partitions: facts
                .partitions
                .iter()
                .map(|p| JsonPartition {
                    name: &p.name,
                    fstype: p.fstype.as_deref(),
                    mountpoint: p.mountpoint.as_deref(),
                    is_mounted: p.is_mounted,
                    usage: p.usage,
                    uuid: p.uuid.as_deref(),
                    label: p.label.as_deref(),
                    total: p.total.as_deref(),
                    fs_checks: p.fs_checks.as_ref(),
                    fsck_command: p
                        .fstype
                        .as_deref()
                        .filter(|_| !p.is_mounted)
                        .and_then(|fs| fsck_command(&p.name, fs, true)),
                })
                .collect(),
            issues: report.issues(),
            scan_time: report.scan_time.as_secs_f64(),
            io_stats: report.io_stats,
        }
    }
}

fn checks_or_empty<S: Serializer>(
    checks: &Option<&FilesystemChecks>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match checks {
        Some(checks) => checks.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// Write the pretty-printed JSON document in input order
pub fn render_json(
    out: &mut impl Write,
    reports: &[DeviceReport],
    ctx: &ReportContext,
) -> crate::Result<()> {
    let report = JsonReport::new(reports, ctx);
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}
