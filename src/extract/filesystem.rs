// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Filesystem identification and offline state checks
//!
//! `blkid` identifies the filesystem on a partition. For unmounted ext2/3/4
//! partitions `dumpe2fs -h` reports the recorded clean/dirty state and mount
//! counters without mounting anything.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::FactParser;
use crate::config::FilesystemConfig;
use crate::runner::{argv, CommandExecutor};
use crate::tools::ToolLocator;

/// Timeout for `dumpe2fs -h`, which only reads the superblock
const DUMPE2FS_TIMEOUT: Duration = Duration::from_secs(5);

const EXT_FAMILY: &[&str] = &["ext2", "ext3", "ext4"];

/// Identity reported by `blkid`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlkidInfo {
    pub uuid: Option<String>,
    pub fstype: Option<String>,
    pub label: Option<String>,
}

fn blkid_regex(key: &str) -> Option<Regex> {
    // Anchor on whitespace so PARTUUID/SEC_TYPE do not shadow UUID/TYPE
    Regex::new(&format!(r#"(?:^|\s){}="([^"]+)""#, key)).ok()
}

fn blkid_patterns() -> Option<&'static (Regex, Regex, Regex)> {
    static PATTERNS: OnceLock<Option<(Regex, Regex, Regex)>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| Some((blkid_regex("UUID")?, blkid_regex("TYPE")?, blkid_regex("LABEL")?)))
        .as_ref()
}

/// Parses `KEY="value"` pairs printed by `blkid /dev/<part>`
#[derive(Debug, Clone, Copy, Default)]
pub struct BlkidParser;

impl FactParser for BlkidParser {
    type Fact = BlkidInfo;

    fn parse(&self, stdout: &str, _stderr: &str) -> BlkidInfo {
        let Some((uuid, fstype, label)) = blkid_patterns() else {
            return BlkidInfo::default();
        };
        let capture = |re: &Regex| re.captures(stdout).map(|c| c[1].to_string());
        BlkidInfo {
            uuid: capture(uuid),
            fstype: capture(fstype),
            label: capture(label),
        }
    }
}

/// Offline state of an unmounted filesystem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemChecks {
    /// False when the filesystem type is outside `filesystem.supported_fs`
    pub supported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_mount_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_check: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<String>,
}

impl FilesystemChecks {
    pub fn unsupported() -> Self {
        Self::default()
    }

    pub fn supported() -> Self {
        Self {
            supported: true,
            ..Self::default()
        }
    }

    /// Recorded state other than "clean"
    pub fn is_unclean(&self) -> bool {
        matches!(&self.state, Some(state) if state != "clean")
    }

    pub fn needs_check(&self) -> bool {
        self.needs_check.unwrap_or(false)
    }
}

struct Dumpe2fsPatterns {
    state: Regex,
    mount_count: Regex,
    max_mount_count: Regex,
    last_checked: Regex,
}

fn dumpe2fs_patterns() -> Option<&'static Dumpe2fsPatterns> {
    static PATTERNS: OnceLock<Option<Dumpe2fsPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(Dumpe2fsPatterns {
                state: Regex::new(r"(?m)^Filesystem state:\s*(\w+)").ok()?,
                mount_count: Regex::new(r"(?m)^Mount count:\s*(\d+)").ok()?,
                max_mount_count: Regex::new(r"(?m)^Maximum mount count:\s*(-?\d+)").ok()?,
                last_checked: Regex::new(r"(?m)^Last checked:[ \t]*(.+)$").ok()?,
            })
        })
        .as_ref()
}

/// Reads state, mount counters and last check time from `dumpe2fs -h`
#[derive(Debug, Clone, Copy, Default)]
pub struct Dumpe2fsParser;

impl FactParser for Dumpe2fsParser {
    type Fact = FilesystemChecks;

    fn parse(&self, stdout: &str, _stderr: &str) -> FilesystemChecks {
        let mut checks = FilesystemChecks::supported();
        let Some(p) = dumpe2fs_patterns() else {
            return checks;
        };

        if let Some(caps) = p.state.captures(stdout) {
            let state = caps[1].to_string();
            checks.clean = Some(state == "clean");
            checks.state = Some(state);
        }

        let mount_count = p
            .mount_count
            .captures(stdout)
            .and_then(|c| c[1].parse::<u32>().ok());
        let max_mount = p
            .max_mount_count
            .captures(stdout)
            .and_then(|c| c[1].parse::<i64>().ok());
        // A maximum of -1 or 0 disables count-based checking
        if let (Some(count), Some(max)) = (mount_count, max_mount) {
            if let Ok(max) = u32::try_from(max) {
                if max > 0 {
                    checks.mount_count = Some(count);
                    checks.max_mount_count = Some(max);
                    checks.needs_check = Some(count >= max);
                }
            }
        }

        if let Some(caps) = p.last_checked.captures(stdout) {
            checks.last_checked = Some(caps[1].trim().to_string());
        }

        checks
    }
}

/// Inspect an unmounted filesystem without mounting it.
///
/// Returns `None` when checking is disabled. Unsupported types yield
/// `supported: false`; xfs is treated as clean (self-healing) and btrfs as
/// clean when the btrfs tool is installed.
pub async fn check_unmounted_filesystem(
    exec: &dyn CommandExecutor,
    locator: &ToolLocator,
    config: &FilesystemConfig,
    partition: &str,
    fstype: &str,
) -> Option<FilesystemChecks> {
    if !config.check_unmounted {
        return None;
    }
    if !config.is_supported(fstype) {
        return Some(FilesystemChecks::unsupported());
    }

    let mut checks = FilesystemChecks::supported();
    if EXT_FAMILY.contains(&fstype) {
        if locator.is_available("dumpe2fs") {
            let outcome = exec
                .run(
                    &argv(["dumpe2fs", "-h", &format!("/dev/{}", partition)]),
                    Some(DUMPE2FS_TIMEOUT),
                )
                .await;
            if outcome.success() {
                checks = Dumpe2fsParser.parse(outcome.stdout(), &outcome.stderr());
            } else {
                log::debug!("dumpe2fs failed for {}: {}", partition, outcome.stderr().trim());
            }
        }
    } else if fstype == "xfs" {
        checks.clean = Some(true);
    } else if fstype == "btrfs" && locator.is_available("btrfs") {
        checks.clean = Some(true);
    }

    Some(checks)
}

/// Suggested check/repair command for a partition. Never executed.
///
/// `force` selects the thorough variant (`-f` for ext, no `-n` for xfs).
pub fn fsck_command(partition: &str, fstype: &str, force: bool) -> Option<String> {
    if fstype.is_empty() {
        return None;
    }
    let dev = format!("/dev/{}", partition);
    let base = match fstype {
        "ext2" | "ext3" | "ext4" => {
            format!("fsck.{} {} {}", fstype, if force { "-f" } else { "" }, dev)
        }
        "xfs" => format!("xfs_repair {} {}", if force { "" } else { "-n" }, dev),
        "btrfs" => format!("btrfs check {}", dev),
        "ntfs" => format!("ntfsfix {}", dev),
        "vfat" => format!("fsck.vfat -a {}", dev),
        "exfat" => format!("fsck.exfat {}", dev),
        "f2fs" => format!("fsck.f2fs {}", dev),
        "reiserfs" => format!("reiserfsck --check {}", dev),
        "jfs" => format!("fsck.jfs -n {}", dev),
        "hfsplus" => format!("fsck.hfsplus -f {}", dev),
        _ => return Some(format!("fsck -t {} {}", fstype, dev)),
    };
    Some(format!("sudo {}", base.split_whitespace().collect::<Vec<_>>().join(" ")))
}
