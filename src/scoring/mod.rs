// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Health scoring
//!
//! A drive's score is the sum of independent rule contributions; higher is
//! worse and zero means nothing was found. Rules run in a fixed order and
//! the issue list follows that order, so identical facts always produce the
//! same score and the same issues.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::devices::Partition;
use crate::extract::{SmartAttributes, SmartHealth};

/// Attributes whose raw count is charged per sector
pub const SCORED_ATTRIBUTES: &[&str] = &[
    "Reallocated_Sectors",
    "Current_Pending_Sector",
    "Offline_Uncorrectable",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// One finding attached to a drive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Everything the scorer looks at for one drive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFacts {
    /// Absent when SMART was not queried
    pub smart_health: Option<SmartHealth>,
    pub smart_attrs: SmartAttributes,
    pub temperature: Option<i64>,
    pub usage: Option<u32>,
    pub partitions: Vec<Partition>,
}

/// Score plus the findings that produced it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub score: u64,
    pub issues: Vec<Issue>,
}

impl Assessment {
    fn add(&mut self, points: u64, severity: Severity, message: impl Into<String>) {
        self.score = self.score.saturating_add(points);
        self.issues.push(Issue::new(severity, message));
    }
}

/// Score a drive's facts
pub fn score(facts: &DeviceFacts, cfg: &Thresholds) -> Assessment {
    let mut out = Assessment::default();

    match facts.smart_health {
        Some(SmartHealth::Failed) => {
            out.add(cfg.smart_fail_score, Severity::Critical, "SMART Health Check failed!")
        }
        Some(SmartHealth::Unknown) => {
            out.add(cfg.smart_unknown_score, Severity::Warning, "SMART status unknown")
        }
        Some(SmartHealth::NeedRoot) => out.add(
            cfg.smart_need_root_score,
            Severity::Info,
            "Root privileges required for SMART check",
        ),
        Some(SmartHealth::NoSmart) => {
            out.add(cfg.smart_no_support_score, Severity::Info, "SMART not available")
        }
        Some(SmartHealth::NoSmartctl) => {
            out.add(cfg.smart_unknown_score, Severity::Warning, "smartctl not available")
        }
        Some(SmartHealth::Passed) | None => {}
    }

    for attr in SCORED_ATTRIBUTES {
        if let Some(&count) = facts.smart_attrs.get(*attr).filter(|c| **c > 0) {
            out.add(
                cfg.reallocated_sector_multiplier.saturating_mul(count),
                Severity::Warning,
                format!("{}: {}", attr, count),
            );
        }
    }

    // Strictly greater: a drive sitting exactly at the threshold is fine
    if let Some(temp) = facts.temperature {
        if temp > cfg.temp_critical {
            out.add(
                cfg.temp_critical_score,
                Severity::Critical,
                format!("Very high temperature: {}°C", temp),
            );
        } else if temp > cfg.temp_warning {
            out.add(
                cfg.temp_warning_score,
                Severity::Warning,
                format!("Elevated temperature: {}°C", temp),
            );
        }
    }

    if let Some(usage) = facts.usage {
        if usage >= cfg.usage_critical {
            out.add(
                cfg.usage_critical_score,
                Severity::Critical,
                format!("Critically low disk space: {}%", usage),
            );
        } else if usage >= cfg.usage_warning {
            out.add(
                cfg.usage_warning_score,
                Severity::Warning,
                format!("Low disk space: {}%", usage),
            );
        } else if usage >= cfg.usage_info {
            out.add(
                cfg.usage_info_score,
                Severity::Info,
                format!("Disk space getting low: {}%", usage),
            );
        }
    }

    let mut unmounted = 0usize;
    let mut unclean = 0usize;
    for partition in facts.partitions.iter().filter(|p| !p.is_mounted) {
        unmounted += 1;
        let Some(checks) = &partition.fs_checks else {
            continue;
        };
        if checks.is_unclean() {
            unclean += 1;
            out.add(
                cfg.unmounted_partition_score.saturating_mul(2),
                Severity::Warning,
                format!(
                    "Unmounted partition {} needs fsck (state: {})",
                    partition.name,
                    checks.state.as_deref().unwrap_or_default()
                ),
            );
        } else if checks.needs_check() {
            out.add(
                cfg.unmounted_partition_score,
                Severity::Info,
                format!("Unmounted partition {} due for check", partition.name),
            );
        }
    }
    if unmounted > 0 && unclean == 0 {
        out.add(
            cfg.unmounted_partition_score,
            Severity::Info,
            format!("{} unmounted partition(s) found", unmounted),
        );
    }

    out
}

/// Coarse bucket used for the exit code and summary counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Critical,
    Warning,
    Ok,
}

impl DeviceClass {
    pub fn classify(score: u64, cfg: &Thresholds) -> Self {
        if score >= cfg.critical_device_score {
            DeviceClass::Critical
        } else if score >= cfg.warning_device_score {
            DeviceClass::Warning
        } else {
            DeviceClass::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FilesystemChecks;

    fn unmounted(name: &str, checks: Option<FilesystemChecks>) -> Partition {
        Partition {
            name: name.to_string(),
            fstype: Some("ext4".into()),
            fs_checks: checks,
            ..Partition::default()
        }
    }

    fn messages(a: &Assessment) -> Vec<&str> {
        a.issues.iter().map(|i| i.message.as_str()).collect()
    }

    #[test]
    fn test_healthy_drive_scores_zero() {
        let facts = DeviceFacts {
            smart_health: Some(SmartHealth::Passed),
            temperature: Some(35),
            usage: Some(42),
            ..Default::default()
        };
        let a = score(&facts, &Thresholds::default());
        assert_eq!(a.score, 0);
        assert!(a.issues.is_empty());
        assert_eq!(DeviceClass::classify(a.score, &Thresholds::default()), DeviceClass::Ok);
    }

    #[test]
    fn test_failed_hot_full_drive() {
        let mut attrs = SmartAttributes::new();
        attrs.insert("Reallocated_Sectors".into(), 8);
        attrs.insert("UDMA_CRC_Error_Count".into(), 14);
        let facts = DeviceFacts {
            smart_health: Some(SmartHealth::Failed),
            smart_attrs: attrs,
            temperature: Some(65),
            usage: Some(97),
            ..Default::default()
        };
        let a = score(&facts, &Thresholds::default());
        assert_eq!(a.score, 1000 + 800 + 200 + 300);
        assert_eq!(
            messages(&a),
            [
                "SMART Health Check failed!",
                "Reallocated_Sectors: 8",
                "Very high temperature: 65°C",
                "Critically low disk space: 97%",
            ]
        );
        assert_eq!(a.issues[0].severity, Severity::Critical);
        assert_eq!(a.issues[1].severity, Severity::Warning);
        assert_eq!(DeviceClass::classify(a.score, &Thresholds::default()), DeviceClass::Critical);
    }

    #[test]
    fn test_need_root_with_warning_usage() {
        let facts = DeviceFacts {
            smart_health: Some(SmartHealth::NeedRoot),
            usage: Some(91),
            ..Default::default()
        };
        let a = score(&facts, &Thresholds::default());
        assert_eq!(a.score, 110);
        assert_eq!(
            messages(&a),
            ["Root privileges required for SMART check", "Low disk space: 91%"]
        );
        assert_eq!(DeviceClass::classify(a.score, &Thresholds::default()), DeviceClass::Warning);
    }

    #[test]
    fn test_missing_smartctl_scores_as_unknown() {
        let facts = DeviceFacts {
            smart_health: Some(SmartHealth::NoSmartctl),
            ..Default::default()
        };
        let a = score(&facts, &Thresholds::default());
        assert_eq!(a.score, 50);
        assert_eq!(a.issues[0], Issue::new(Severity::Warning, "smartctl not available"));
    }

    #[test]
    fn test_threshold_boundaries() {
        let cfg = Thresholds::default();
        let at = |temperature, usage| DeviceFacts {
            temperature: Some(temperature),
            usage: Some(usage),
            ..Default::default()
        };

        // Temperature exactly at a threshold does not fire, usage does
        let a = score(&at(60, 95), &cfg);
        assert_eq!(
            messages(&a),
            ["Elevated temperature: 60°C", "Critically low disk space: 95%"]
        );
        let a = score(&at(50, 90), &cfg);
        assert_eq!(messages(&a), ["Low disk space: 90%"]);
        let a = score(&at(51, 80), &cfg);
        assert_eq!(
            messages(&a),
            ["Elevated temperature: 51°C", "Disk space getting low: 80%"]
        );
        assert_eq!(a.score, 70);
        assert!(score(&at(0, 0), &cfg).issues.is_empty());
    }

    #[test]
    fn test_zero_usage_is_scored_when_thresholds_allow() {
        let cfg = Thresholds {
            usage_info: 0,
            ..Thresholds::default()
        };
        let facts = DeviceFacts {
            usage: Some(0),
            ..Default::default()
        };
        assert_eq!(messages(&score(&facts, &cfg)), ["Disk space getting low: 0%"]);
    }

    #[test]
    fn test_unclean_unmounted_suppresses_flat_info() {
        let dirty = FilesystemChecks {
            state: Some("not".into()),
            clean: Some(false),
            ..FilesystemChecks::supported()
        };
        let facts = DeviceFacts {
            smart_health: Some(SmartHealth::Passed),
            partitions: vec![unmounted("sdb1", Some(dirty)), unmounted("sdb2", None)],
            ..Default::default()
        };
        let a = score(&facts, &Thresholds::default());
        assert_eq!(a.score, 60);
        assert_eq!(messages(&a), ["Unmounted partition sdb1 needs fsck (state: not)"]);
    }

    #[test]
    fn test_due_for_check_and_flat_info() {
        let due = FilesystemChecks {
            state: Some("clean".into()),
            clean: Some(true),
            mount_count: Some(30),
            max_mount_count: Some(30),
            needs_check: Some(true),
            ..FilesystemChecks::supported()
        };
        let mounted = Partition {
            name: "sdc1".into(),
            is_mounted: true,
            mountpoint: Some("/data".into()),
            ..Partition::default()
        };
        let facts = DeviceFacts {
            partitions: vec![mounted, unmounted("sdc2", Some(due)), unmounted("sdc3", None)],
            ..Default::default()
        };
        let a = score(&facts, &Thresholds::default());
        assert_eq!(a.score, 60);
        assert_eq!(
            messages(&a),
            ["Unmounted partition sdc2 due for check", "2 unmounted partition(s) found"]
        );
        assert!(a.issues.iter().all(|i| i.severity == Severity::Info));
    }

    #[test]
    fn test_failed_smart_with_moderate_usage() {
        let facts = DeviceFacts {
            smart_health: Some(SmartHealth::Failed),
            usage: Some(50),
            ..Default::default()
        };
        let a = score(&facts, &Thresholds::default());
        assert_eq!(a.score, 1000);
        assert_eq!(a.issues, [Issue::new(Severity::Critical, "SMART Health Check failed!")]);
    }

    #[test]
    fn test_hot_drive_without_mounts() {
        let facts = DeviceFacts {
            smart_health: Some(SmartHealth::Passed),
            temperature: Some(65),
            ..Default::default()
        };
        let a = score(&facts, &Thresholds::default());
        assert_eq!(a.score, 200);
        assert_eq!(messages(&a), ["Very high temperature: 65°C"]);
        assert_eq!(a.issues[0].severity, Severity::Critical);
    }

    #[test]
    fn test_clean_unmounted_gets_flat_info_only() {
        let clean = FilesystemChecks {
            state: Some("clean".into()),
            clean: Some(true),
            mount_count: Some(5),
            max_mount_count: Some(20),
            needs_check: Some(false),
            ..FilesystemChecks::supported()
        };
        let facts = DeviceFacts {
            smart_health: Some(SmartHealth::Passed),
            partitions: vec![unmounted("sdd1", Some(clean))],
            ..Default::default()
        };
        let a = score(&facts, &Thresholds::default());
        assert_eq!(a.score, 30);
        assert_eq!(messages(&a), ["1 unmounted partition(s) found"]);
        assert_eq!(a.issues[0].severity, Severity::Info);
    }

    #[test]
    fn test_score_is_deterministic() {
        let mut attrs = SmartAttributes::new();
        attrs.insert("Offline_Uncorrectable".into(), 3);
        attrs.insert("Current_Pending_Sector".into(), 2);
        let facts = DeviceFacts {
            smart_health: Some(SmartHealth::Unknown),
            smart_attrs: attrs,
            temperature: Some(55),
            usage: Some(85),
            partitions: vec![unmounted("sdd1", None)],
        };
        let cfg = Thresholds::default();
        let first = score(&facts, &cfg);
        assert_eq!(first, score(&facts, &cfg));
        assert_eq!(first.score, 50 + 200 + 300 + 50 + 20 + 30);
        assert_eq!(first.issues[1].message, "Current_Pending_Sector: 2");
        assert_eq!(first.issues[2].message, "Offline_Uncorrectable: 3");
    }

    #[test]
    fn test_saturating_arithmetic() {
        let mut attrs = SmartAttributes::new();
        attrs.insert("Reallocated_Sectors".into(), u64::MAX);
        let facts = DeviceFacts {
            smart_health: Some(SmartHealth::Failed),
            smart_attrs: attrs,
            ..Default::default()
        };
        assert_eq!(score(&facts, &Thresholds::default()).score, u64::MAX);
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"CRITICAL\"");
        assert_eq!(Severity::Info.to_string(), "INFO");
    }
}
