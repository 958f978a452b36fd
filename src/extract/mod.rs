// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Fact extraction from raw tool output
//!
//! Each parser turns the text of one external tool into a typed fact. Parsers
//! are pure and never fail: malformed input degrades to an absent or empty
//! fact. The async `get_*` helpers pair a parser with the command it reads.

pub mod filesystem;
pub mod iostats;
pub mod smart;

pub use filesystem::{
    check_unmounted_filesystem, fsck_command, BlkidInfo, BlkidParser, Dumpe2fsParser,
    FilesystemChecks,
};
pub use iostats::{get_io_stats, IoStats, IoStatsParser};
pub use smart::{
    get_smart_attributes, get_smart_health, get_temperature, SmartAttributeParser, SmartAttributes,
    SmartHealth, SmartHealthParser, TemperatureParser,
};

/// Narrow interface every extractor implements.
///
/// Swapping a parser (for example, for one reading `smartctl --json`) does not
/// touch the scoring engine.
pub trait FactParser {
    type Fact;

    fn parse(&self, stdout: &str, stderr: &str) -> Self::Fact;
}
