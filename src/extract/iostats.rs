// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Cumulative block-device I/O counters from `/proc/diskstats`

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::FactParser;

/// Kernel block statistics table
pub const DISKSTATS_PATH: &str = "/proc/diskstats";

/// Counters since boot for one device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoStats {
    pub read_ios: u64,
    pub read_sectors: u64,
    pub write_ios: u64,
    pub write_sectors: u64,
    pub io_time_ms: u64,
}

/// Picks the row for one device out of `/proc/diskstats`.
///
/// Row layout: major minor name reads merged sectors ms writes merged
/// sectors ms in_flight io_ms weighted_ms ...
#[derive(Debug, Clone)]
pub struct IoStatsParser {
    device: String,
}

impl IoStatsParser {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl FactParser for IoStatsParser {
    type Fact = Option<IoStats>;

    fn parse(&self, stdout: &str, _stderr: &str) -> Option<IoStats> {
        stdout.lines().find_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 14 || parts[2] != self.device {
                return None;
            }
            let field = |i: usize| parts[i].parse::<u64>().ok();
            Some(IoStats {
                read_ios: field(3)?,
                read_sectors: field(5)?,
                write_ios: field(7)?,
                write_sectors: field(9)?,
                io_time_ms: field(12)?,
            })
        })
    }
}

/// Read the counters for `dev` from a diskstats file
pub async fn get_io_stats(path: &Path, dev: &str) -> Option<IoStats> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => IoStatsParser::new(dev).parse(&content, ""),
        Err(e) => {
            log::debug!("Could not read {}: {}", path.display(), e);
            None
        }
    }
}
