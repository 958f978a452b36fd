// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! S.M.A.R.T. health, attribute and temperature extraction from `smartctl`
//!
//! `smartctl -H` yields the overall verdict; `smartctl -A` yields the
//! attribute table, which also carries the drive temperature.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::FactParser;
use crate::runner::{argv, CommandExecutor};

/// Overall S.M.A.R.T. health as reported by `smartctl -H`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmartHealth {
    /// Self-assessment passed
    Passed,
    /// Self-assessment failed, drive failure is imminent
    Failed,
    /// Output could not be interpreted
    Unknown,
    /// Access to the device was denied
    NeedRoot,
    /// Device does not support S.M.A.R.T.
    NoSmart,
    /// smartctl is not installed
    NoSmartctl,
}

impl SmartHealth {
    /// Whether the attribute table is worth querying after this verdict
    pub fn allows_attribute_query(self) -> bool {
        !matches!(self, Self::NeedRoot | Self::NoSmart | Self::NoSmartctl)
    }
}

impl std::fmt::Display for SmartHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "PASSED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::NeedRoot => write!(f, "NEED_ROOT"),
            Self::NoSmart => write!(f, "NO_SMART"),
            Self::NoSmartctl => write!(f, "NO_SMARTCTL"),
        }
    }
}

const PERMISSION_MARKERS: &[&str] = &["Permission denied", "Operation not permitted"];
const NOT_FOUND_MARKER: &str = "Command not found";
const UNAVAILABLE_MARKER: &str = "SMART support is: Unavailable";
const OVERALL_HEALTH_MARKER: &str = "SMART overall-health";

/// Classifies `smartctl -H` output.
///
/// Markers can co-occur, so precedence is fixed: permission errors, missing
/// smartctl, unsupported device, then the PASSED/FAILED verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmartHealthParser;

impl FactParser for SmartHealthParser {
    type Fact = SmartHealth;

    fn parse(&self, stdout: &str, stderr: &str) -> SmartHealth {
        if PERMISSION_MARKERS.iter().any(|m| stderr.contains(m)) {
            return SmartHealth::NeedRoot;
        }
        if stderr.contains(NOT_FOUND_MARKER) {
            return SmartHealth::NoSmartctl;
        }
        if stdout.contains(UNAVAILABLE_MARKER) {
            return SmartHealth::NoSmart;
        }
        if stdout.contains(OVERALL_HEALTH_MARKER) {
            if stdout.contains("PASSED") {
                return SmartHealth::Passed;
            }
            if stdout.contains("FAILED") {
                return SmartHealth::Failed;
            }
        }
        SmartHealth::Unknown
    }
}

/// Attribute IDs worth tracking and the names they are reported under
pub const MONITORED_ATTRIBUTES: &[(&str, &str)] = &[
    ("5", "Reallocated_Sectors"),
    ("187", "Reported_Uncorrect"),
    ("188", "Command_Timeout"),
    ("197", "Current_Pending_Sector"),
    ("198", "Offline_Uncorrectable"),
    ("199", "UDMA_CRC_Error_Count"),
];

/// Raw counters of monitored attributes, only those with a positive value
pub type SmartAttributes = BTreeMap<String, u64>;

/// Extracts monitored raw counters from the `smartctl -A` attribute table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmartAttributeParser;

impl FactParser for SmartAttributeParser {
    type Fact = SmartAttributes;

    fn parse(&self, stdout: &str, _stderr: &str) -> SmartAttributes {
        let mut attrs = SmartAttributes::new();

        for line in stdout.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 10 {
                continue;
            }
            let Some((_, name)) = MONITORED_ATTRIBUTES.iter().find(|(id, _)| *id == parts[0]) else {
                continue;
            };
            match parts[9].parse::<u64>() {
                Ok(raw) if raw > 0 => {
                    attrs.insert(name.to_string(), raw);
                }
                Ok(_) => {}
                Err(_) => log::debug!("Skipping malformed raw value for {}: {}", name, parts[9]),
            }
        }

        attrs
    }
}

fn temperature_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // ATA table row: ID NAME FLAG VALUE WORST THRESH TYPE UPDATED WHEN_FAILED RAW
            r"(?im)Temperature_Celsius(?:[ \t]+\S+){7}[ \t]+(\d+)",
            r"(?im)Temperature_Celsius.*[ \t](\d+)[ \t]*(?:C|$)",
            r"(?i)Current Temperature:\s*(\d+)\s*Celsius",
            r"(?i)Temperature:\s*(\d+)\s*C",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Finds the drive temperature in ATA, SCSI or NVMe `smartctl -A` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemperatureParser;

impl FactParser for TemperatureParser {
    type Fact = Option<i64>;

    fn parse(&self, stdout: &str, _stderr: &str) -> Option<i64> {
        temperature_patterns().iter().find_map(|re| {
            re.captures(stdout)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
    }
}

fn device_path(dev: &str) -> String {
    format!("/dev/{}", dev)
}

/// Run `smartctl -H` and classify the result
pub async fn get_smart_health(exec: &dyn CommandExecutor, dev: &str) -> SmartHealth {
    let outcome = exec
        .run(&argv(["smartctl", "-H", &device_path(dev)]), None)
        .await;
    SmartHealthParser.parse(outcome.stdout(), &outcome.stderr())
}

/// Run `smartctl -A` and collect monitored counters.
///
/// Empty on permission errors, missing smartctl or a non-zero exit.
pub async fn get_smart_attributes(exec: &dyn CommandExecutor, dev: &str) -> SmartAttributes {
    let outcome = exec
        .run(&argv(["smartctl", "-A", &device_path(dev)]), None)
        .await;
    let stderr = outcome.stderr();
    if !outcome.success()
        || PERMISSION_MARKERS.iter().any(|m| stderr.contains(m))
        || stderr.contains(NOT_FOUND_MARKER)
    {
        return SmartAttributes::new();
    }
    SmartAttributeParser.parse(outcome.stdout(), &stderr)
}

/// Run `smartctl -A` and pull out the current temperature in °C
pub async fn get_temperature(exec: &dyn CommandExecutor, dev: &str) -> Option<i64> {
    let outcome = exec
        .run(&argv(["smartctl", "-A", &device_path(dev)]), None)
        .await;
    if !outcome.success() {
        return None;
    }
    TemperatureParser.parse(outcome.stdout(), &outcome.stderr())
}
