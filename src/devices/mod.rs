// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Physical drive and partition discovery
//!
//! Drives and their partitions come from `lsblk` JSON output. Filesystem
//! identity is probed with `blkid` when available, and mounted partitions are
//! measured with `statvfs(3)`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::FilesystemConfig;
use crate::extract::{check_unmounted_filesystem, BlkidParser, FactParser, FilesystemChecks};
use crate::runner::{argv, CommandExecutor};
use crate::tools::ToolLocator;

/// A whole physical drive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Kernel name, e.g. `sda` or `nvme0n1`
    pub name: String,
    pub model: String,
    /// Human readable size as reported by lsblk
    pub size: String,
    pub rotational: bool,
}

/// Space accounting for one mounted filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountUsage {
    pub mountpoint: String,
    pub usage: u32,
    pub total: String,
    pub used: String,
    pub free: String,
}

/// One partition of a drive, mounted or not
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub name: String,
    pub fstype: Option<String>,
    pub mountpoint: Option<String>,
    pub uuid: Option<String>,
    pub label: Option<String>,
    pub is_mounted: bool,
    pub usage: Option<u32>,
    /// Filesystem size when mounted, partition size otherwise
    pub total: Option<String>,
    pub used: Option<String>,
    pub free: Option<String>,
    /// Offline checks; only for unmounted partitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs_checks: Option<FilesystemChecks>,
}

impl Partition {
    pub fn fstype_or_unknown(&self) -> &str {
        self.fstype.as_deref().unwrap_or("Unknown")
    }
}

/// Everything learned about the partitions of one drive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionScan {
    /// Highest usage over mounted partitions; absent when nothing is mounted
    pub max_usage: Option<u32>,
    pub mount_points: Vec<MountUsage>,
    pub partitions: Vec<Partition>,
}

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<LsblkEntry>,
}

#[derive(Debug, Deserialize)]
struct LsblkEntry {
    name: Option<String>,
    model: Option<String>,
    size: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    rota: Option<serde_json::Value>,
    fstype: Option<String>,
    mountpoint: Option<String>,
    #[serde(default)]
    mountpoints: Vec<Option<String>>,
    #[serde(default)]
    children: Vec<LsblkEntry>,
}

impl LsblkEntry {
    /// lsblk prints ROTA as "1", 1 or true depending on version
    fn is_rotational(&self) -> bool {
        match &self.rota {
            Some(serde_json::Value::String(s)) => s == "1",
            Some(serde_json::Value::Number(n)) => n.as_u64() == Some(1),
            Some(serde_json::Value::Bool(b)) => *b,
            _ => false,
        }
    }

    /// Older lsblk has `mountpoint`, newer has a `mountpoints` list
    fn mount_point(&self) -> Option<String> {
        self.mountpoint
            .iter()
            .chain(self.mountpoints.iter().flatten())
            .map(|m| m.trim())
            .find(|m| !m.is_empty())
            .map(str::to_string)
    }

    fn flatten<'a>(&'a self, out: &mut Vec<&'a LsblkEntry>) {
        out.push(self);
        for child in &self.children {
            child.flatten(out);
        }
    }
}

/// Parse `lsblk -dJ -o NAME,MODEL,SIZE,TYPE,ROTA` output into drives
pub fn parse_devices(json: &str) -> crate::Result<Vec<Device>> {
    let output: LsblkOutput = serde_json::from_str(json)?;
    Ok(output
        .blockdevices
        .iter()
        .filter(|d| d.kind.as_deref() == Some("disk"))
        .filter_map(|d| {
            let name = d.name.clone()?;
            let model = d
                .model
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or("Unknown")
                .to_string();
            Some(Device {
                name,
                model,
                size: d.size.clone().unwrap_or_else(|| "Unknown".into()),
                rotational: d.is_rotational(),
            })
        })
        .collect())
}

/// Enumerate physical drives.
///
/// A failed or unparsable listing yields no drives; the caller treats that
/// the same as a system without disks.
pub async fn list_devices(exec: &dyn CommandExecutor) -> Vec<Device> {
    let outcome = exec
        .run(&argv(["lsblk", "-dJ", "-o", "NAME,MODEL,SIZE,TYPE,ROTA"]), None)
        .await;
    if !outcome.success() {
        log::error!("lsblk failed: {}", outcome.stderr().trim());
        return Vec::new();
    }
    match parse_devices(outcome.stdout()) {
        Ok(devices) => {
            log::info!("Found {} disk(s)", devices.len());
            devices
        }
        Err(e) => {
            log::error!("Failed to parse lsblk output: {}", e);
            Vec::new()
        }
    }
}

/// Raw filesystem sizes in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpace {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

impl DiskSpace {
    /// `floor(used / total * 100)`; `None` for a zero-sized filesystem
    pub fn usage_percent(&self) -> Option<u32> {
        if self.total == 0 {
            return None;
        }
        u32::try_from(u128::from(self.used) * 100 / u128::from(self.total)).ok()
    }
}

/// `statvfs` the mount point on the blocking pool, bounded by `timeout`.
///
/// A hung network mount must not stall the drive's analysis.
pub async fn disk_space(mountpoint: &str, timeout: Duration) -> Option<DiskSpace> {
    let path = PathBuf::from(mountpoint);
    let task = tokio::task::spawn_blocking(move || statvfs_space(&path));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(space))) => Some(space),
        Ok(Ok(Err(e))) => {
            log::debug!("Failed to get usage for {}: {}", mountpoint, e);
            None
        }
        Ok(Err(e)) => {
            log::warn!("Usage query for {} aborted: {}", mountpoint, e);
            None
        }
        Err(_) => {
            log::warn!("Usage query timed out: {}", mountpoint);
            None
        }
    }
}

#[cfg(unix)]
fn statvfs_space(path: &std::path::Path) -> std::io::Result<DiskSpace> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(std::io::Error::from)?;
    let frsize = stat.fragment_size() as u64;
    let blocks = stat.blocks() as u64;
    Ok(DiskSpace {
        total: blocks.saturating_mul(frsize),
        used: blocks
            .saturating_sub(stat.blocks_free() as u64)
            .saturating_mul(frsize),
        free: (stat.blocks_available() as u64).saturating_mul(frsize),
    })
}

#[cfg(not(unix))]
fn statvfs_space(_path: &std::path::Path) -> std::io::Result<DiskSpace> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "statvfs is not available on this platform",
    ))
}

/// Discover the partitions of `/dev/<dev>`.
///
/// Nested children are flattened; the drive's own row is skipped.
pub async fn get_partitions(
    exec: &dyn CommandExecutor,
    locator: &ToolLocator,
    fs_config: &FilesystemConfig,
    dev: &str,
    usage_timeout: Duration,
) -> PartitionScan {
    let mut scan = PartitionScan::default();

    let outcome = exec
        .run(
            &argv(["lsblk", "-lnJ", "-o", "NAME,MOUNTPOINT,FSTYPE,SIZE", &format!("/dev/{}", dev)]),
            None,
        )
        .await;
    if !outcome.success() {
        log::debug!("Partition listing failed for {}: {}", dev, outcome.stderr().trim());
        return scan;
    }
    let output: LsblkOutput = match serde_json::from_str(outcome.stdout()) {
        Ok(output) => output,
        Err(e) => {
            log::error!("Failed to parse partition info: {}", e);
            return scan;
        }
    };

    let mut entries = Vec::new();
    for root in &output.blockdevices {
        root.flatten(&mut entries);
    }

    for entry in entries {
        let Some(name) = entry.name.as_deref().filter(|n| *n != dev) else {
            continue;
        };

        let mut partition = Partition {
            name: name.to_string(),
            fstype: entry.fstype.clone().filter(|f| !f.is_empty()),
            mountpoint: entry.mount_point(),
            ..Partition::default()
        };
        partition.is_mounted = partition.mountpoint.is_some();

        if locator.is_available("blkid") {
            let probe = exec
                .run(&argv(["blkid", &format!("/dev/{}", name)]), None)
                .await;
            if probe.success() {
                let info = BlkidParser.parse(probe.stdout(), "");
                partition.uuid = info.uuid;
                partition.label = info.label;
                if info.fstype.is_some() {
                    partition.fstype = info.fstype;
                }
            }
        }

        match partition.mountpoint.clone() {
            Some(mountpoint) => {
                let space = disk_space(&mountpoint, usage_timeout).await;
                if let Some((space, usage)) = space.and_then(|s| Some((s, s.usage_percent()?))) {
                    let (total, used, free) = (
                        format_bytes(space.total),
                        format_bytes(space.used),
                        format_bytes(space.free),
                    );
                    scan.max_usage = Some(scan.max_usage.map_or(usage, |m| m.max(usage)));
                    scan.mount_points.push(MountUsage {
                        mountpoint,
                        usage,
                        total: total.clone(),
                        used: used.clone(),
                        free: free.clone(),
                    });
                    partition.usage = Some(usage);
                    partition.total = Some(total);
                    partition.used = Some(used);
                    partition.free = Some(free);
                }
            }
            None => {
                partition.total = Some(entry.size.clone().unwrap_or_else(|| "Unknown".into()));
                if let Some(fstype) = partition.fstype.clone() {
                    partition.fs_checks =
                        check_unmounted_filesystem(exec, locator, fs_config, name, &fstype).await;
                }
            }
        }

        scan.partitions.push(partition);
    }

    scan
}

/// Human readable byte count with one decimal, e.g. `931.5 GB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} PB", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::FakeExecutor;
    use crate::runner::CommandOutcome;

    const LSBLK_DISKS: &str = r#"{
   "blockdevices": [
      {"name":"sda", "model":"Samsung SSD 870 EVO 1TB ", "size":"931.5G", "type":"disk", "rota":false},
      {"name":"sdb", "model":null, "size":"3.6T", "type":"disk", "rota":"1"},
      {"name":"nvme0n1", "model":"   ", "size":"476.9G", "type":"disk", "rota":0},
      {"name":"loop0", "model":null, "size":"63.9M", "type":"loop", "rota":"0"},
      {"name":"sr0", "model":"DVD-RW", "size":"1024M", "type":"rom", "rota":true}
   ]
}"#;

    fn disk_listing_key() -> &'static str {
        "lsblk -dJ -o NAME,MODEL,SIZE,TYPE,ROTA"
    }

    fn partition_listing_key(dev: &str) -> String {
        format!("lsblk -lnJ -o NAME,MOUNTPOINT,FSTYPE,SIZE /dev/{}", dev)
    }

    #[test]
    fn test_parse_devices_filters_and_normalizes() {
        let devices = parse_devices(LSBLK_DISKS).unwrap();
        let names: Vec<_> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["sda", "sdb", "nvme0n1"]);

        assert_eq!(devices[0].model, "Samsung SSD 870 EVO 1TB");
        assert!(!devices[0].rotational);
        assert_eq!(devices[1].model, "Unknown");
        assert!(devices[1].rotational);
        assert_eq!(devices[2].model, "Unknown");
        assert!(!devices[2].rotational);
    }

    #[test]
    fn test_parse_devices_rejects_garbage() {
        assert!(parse_devices("lsblk: unknown column").is_err());
        assert!(parse_devices("{}").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_devices_failure_is_empty() {
        let exec = FakeExecutor::new().respond(
            disk_listing_key(),
            CommandOutcome::completed("", "lsblk: failed", 1),
        );
        assert!(list_devices(&exec).await.is_empty());

        let exec = FakeExecutor::new().ok(disk_listing_key(), "not json");
        assert!(list_devices(&exec).await.is_empty());

        let exec = FakeExecutor::new().ok(disk_listing_key(), LSBLK_DISKS);
        assert_eq!(list_devices(&exec).await.len(), 3);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.0 B");
        assert_eq!(format_bytes(1023), "1023.0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_000_204_886_016), "931.5 GB");
        assert_eq!(format_bytes(1u64 << 50), "1.0 PB");
    }

    #[test]
    fn test_usage_percent_floors() {
        let space = DiskSpace {
            total: 1000,
            used: 999,
            free: 1,
        };
        assert_eq!(space.usage_percent(), Some(99));
        let empty = DiskSpace {
            total: 0,
            used: 0,
            free: 0,
        };
        assert_eq!(empty.usage_percent(), None);
    }

    #[tokio::test]
    async fn test_disk_space_of_root() {
        let space = disk_space("/", Duration::from_secs(5)).await.unwrap();
        assert!(space.total > 0);
        assert!(space.used <= space.total);
        assert!(disk_space("/definitely/not/mounted/here", Duration::from_secs(5))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_get_partitions_mixed() {
        let listing = r#"{"blockdevices":[
            {"name":"sda","mountpoint":null,"fstype":null,"size":"931.5G"},
            {"name":"sda1","mountpoint":"/","fstype":"ext4","size":"100G"},
            {"name":"sda2","mountpoint":null,"fstype":"ext4","size":"800G"},
            {"name":"sda3","mountpoint":null,"fstype":null,"size":"1G"}
        ]}"#;
        let dumpe2fs = "Filesystem state:         not clean\nMount count:              3\nMaximum mount count:      -1\n";
        let exec = FakeExecutor::new()
            .ok(&partition_listing_key("sda"), listing)
            .ok("blkid /dev/sda1", r#"/dev/sda1: UUID="aaaa" TYPE="ext4""#)
            .ok("blkid /dev/sda2", r#"/dev/sda2: LABEL="archive" UUID="bbbb" TYPE="ext4""#)
            .respond("blkid /dev/sda3", CommandOutcome::completed("", "", 2))
            .ok("dumpe2fs -h /dev/sda2", dumpe2fs);
        let locator = ToolLocator::new(Vec::<PathBuf>::new());
        locator.register("blkid", "/sbin/blkid");
        locator.register("dumpe2fs", "/sbin/dumpe2fs");

        let scan = get_partitions(
            &exec,
            &locator,
            &FilesystemConfig::default(),
            "sda",
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(scan.partitions.len(), 3);
        let root = &scan.partitions[0];
        assert!(root.is_mounted);
        assert_eq!(root.uuid.as_deref(), Some("aaaa"));
        assert_eq!(scan.mount_points.len(), 1);
        assert_eq!(scan.max_usage, root.usage);
        assert!(root.fs_checks.is_none());

        let archive = &scan.partitions[1];
        assert!(!archive.is_mounted);
        assert_eq!(archive.label.as_deref(), Some("archive"));
        assert_eq!(archive.total.as_deref(), Some("800G"));
        let checks = archive.fs_checks.as_ref().unwrap();
        assert!(checks.is_unclean());
        assert_eq!(checks.needs_check, None);

        let unknown = &scan.partitions[2];
        assert_eq!(unknown.fstype_or_unknown(), "Unknown");
        assert!(unknown.fs_checks.is_none());
    }

    #[tokio::test]
    async fn test_get_partitions_nested_children_without_blkid() {
        let listing = r#"{"blockdevices":[
            {"name":"nvme0n1","mountpoints":[null],"fstype":null,"size":"476.9G","children":[
                {"name":"nvme0n1p1","mountpoints":[null],"fstype":"vfat","size":"512M"},
                {"name":"nvme0n1p2","mountpoints":[null],"fstype":"xfs","size":"476G"}
            ]}
        ]}"#;
        let exec = FakeExecutor::new().ok(&partition_listing_key("nvme0n1"), listing);
        let locator = ToolLocator::new(Vec::<PathBuf>::new());

        let scan = get_partitions(
            &exec,
            &locator,
            &FilesystemConfig::default(),
            "nvme0n1",
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(scan.max_usage, None);
        assert!(scan.mount_points.is_empty());
        let names: Vec<_> = scan.partitions.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["nvme0n1p1", "nvme0n1p2"]);
        assert_eq!(scan.partitions[1].fs_checks.as_ref().unwrap().clean, Some(true));
        assert!(!exec.calls().iter().any(|c| c.starts_with("blkid")));
    }

    #[tokio::test]
    async fn test_get_partitions_listing_failure() {
        let exec = FakeExecutor::new();
        let locator = ToolLocator::new(Vec::<PathBuf>::new());
        let scan = get_partitions(
            &exec,
            &locator,
            &FilesystemConfig::default(),
            "sdz",
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(scan, PartitionScan::default());
    }
}
