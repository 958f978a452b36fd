// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Checker configuration
//!
//! Thresholds, worker pool sizing, output preferences, tool search paths and
//! unmounted-filesystem probing. Every section and field falls back to its
//! default, so a partial TOML file only overrides the keys it names.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HealthError, Result};

/// Scores and thresholds consumed by the scoring engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub smart_fail_score: u64,
    pub smart_unknown_score: u64,
    pub smart_need_root_score: u64,
    pub smart_no_support_score: u64,
    /// Applied per sector to reallocated, pending and uncorrectable counts
    pub reallocated_sector_multiplier: u64,
    pub temp_critical: i64,
    pub temp_critical_score: u64,
    pub temp_warning: i64,
    pub temp_warning_score: u64,
    pub usage_critical: u32,
    pub usage_critical_score: u64,
    pub usage_warning: u32,
    pub usage_warning_score: u64,
    pub usage_info: u32,
    pub usage_info_score: u64,
    pub unmounted_partition_score: u64,
    /// Device score at or above which a drive counts as critical
    pub critical_device_score: u64,
    /// Device score at or above which a drive needs attention
    pub warning_device_score: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            smart_fail_score: 1000,
            smart_unknown_score: 50,
            smart_need_root_score: 10,
            smart_no_support_score: 5,
            reallocated_sector_multiplier: 100,
            temp_critical: 60,
            temp_critical_score: 200,
            temp_warning: 50,
            temp_warning_score: 50,
            usage_critical: 95,
            usage_critical_score: 300,
            usage_warning: 90,
            usage_warning_score: 100,
            usage_info: 80,
            usage_info_score: 20,
            unmounted_partition_score: 30,
            critical_device_score: 500,
            warning_device_score: 100,
        }
    }
}

/// Worker pool and command timeout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub max_workers: usize,
    /// Default per-command timeout in seconds
    pub command_timeout: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            command_timeout: 10,
        }
    }
}

impl PerformanceConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout)
    }
}

/// Renderer preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub max_mount_points_shown: usize,
    /// Also gates reading `/proc/diskstats`
    pub show_io_stats: bool,
    pub show_unmounted: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_mount_points_shown: 3,
            show_io_stats: false,
            show_unmounted: true,
        }
    }
}

/// Fallback directories scanned when PATH lookup fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub search_paths: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            search_paths: [
                "/usr/bin",
                "/bin",
                "/usr/sbin",
                "/sbin",
                "/usr/local/bin",
                "/usr/local/sbin",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Unmounted filesystem probing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemConfig {
    pub check_unmounted: bool,
    /// Reserved: fsck is only ever suggested, never executed
    pub run_fsck: bool,
    pub supported_fs: Vec<String>,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            check_unmounted: true,
            run_fsck: false,
            supported_fs: ["ext2", "ext3", "ext4", "xfs", "btrfs", "ntfs", "vfat", "exfat"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl FilesystemConfig {
    pub fn is_supported(&self, fstype: &str) -> bool {
        self.supported_fs.iter().any(|fs| fs == fstype)
    }
}

/// Complete checker configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub thresholds: Thresholds,
    pub performance: PerformanceConfig,
    pub output: OutputConfig,
    pub tools: ToolsConfig,
    pub filesystem: FilesystemConfig,
}

impl HealthConfig {
    /// Load from TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HealthError::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| HealthError::Configuration(format!("TOML parse error: {}", e)))
    }

    /// Load the given file, falling back to defaults.
    ///
    /// A missing path is silent; an unreadable or malformed file is logged.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        if !path.exists() {
            log::debug!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }
        match Self::from_toml_file(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| HealthError::Configuration(format!("TOML serialize error: {}", e)))
    }

    /// Generate sample config
    pub fn sample_toml() -> String {
        r#"# Disk Health Checker configuration
# Every key is optional; omitted keys keep their defaults.

[thresholds]
smart_fail_score = 1000
smart_unknown_score = 50
smart_need_root_score = 10
smart_no_support_score = 5
reallocated_sector_multiplier = 100
temp_critical = 60
temp_critical_score = 200
temp_warning = 50
temp_warning_score = 50
usage_critical = 95
usage_critical_score = 300
usage_warning = 90
usage_warning_score = 100
usage_info = 80
usage_info_score = 20
unmounted_partition_score = 30
critical_device_score = 500
warning_device_score = 100

[performance]
max_workers = 4
command_timeout = 10

[output]
max_mount_points_shown = 3
show_io_stats = false
show_unmounted = true

[tools]
search_paths = ["/usr/bin", "/bin", "/usr/sbin", "/sbin", "/usr/local/bin", "/usr/local/sbin"]

[filesystem]
check_unmounted = true
run_fsck = false
supported_fs = ["ext2", "ext3", "ext4", "xfs", "btrfs", "ntfs", "vfat", "exfat"]
"#
        .into()
    }
}
