// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! External tool resolution
//!
//! Cron jobs and systemd units often run with a PATH that lacks `/sbin` or
//! `/usr/sbin`, where `smartctl`, `blkid` and `dumpe2fs` live. The
//! [`ToolLocator`] resolves tool names to absolute paths once, first through a
//! PATH lookup and then by scanning a fixed list of standard directories, and
//! caches every hit for the rest of the process.
//!
//! # Examples
//!
//! ```no_run
//! use dhclib::tools::ToolLocator;
//!
//! let locator = ToolLocator::new(["/usr/sbin", "/sbin"]);
//! if let Some(path) = locator.resolve("smartctl") {
//!     println!("smartctl at {}", path.display());
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::config::ToolsConfig;

/// Tools without which no analysis is possible
pub const REQUIRED_TOOLS: &[&str] = &["lsblk"];

/// Tools whose absence only removes the facts they provide
pub const OPTIONAL_TOOLS: &[&str] = &[
    "smartctl", "blkid", "fsck", "file", "dumpe2fs", "xfs_info", "btrfs",
];

/// Result of [`ToolLocator::check_dependencies`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyReport {
    /// Required tools that could not be resolved
    pub missing: Vec<String>,
    /// Optional tools that could not be resolved
    pub optional: Vec<String>,
}

impl DependencyReport {
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Snapshot of the execution environment, useful when debugging cron runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub path: String,
    pub user: String,
    pub home: String,
    pub shell: String,
    pub hostname: String,
    pub is_systemd: bool,
    /// True when stdout is not a terminal (cron, systemd, pipes)
    pub is_cron: bool,
    pub tool_paths: BTreeMap<String, PathBuf>,
}

/// Resolves and caches absolute paths of external tools.
///
/// Safe to share across worker tasks. Concurrent first resolutions of the same
/// name may both run; the first one stored wins and both yield the same path.
#[derive(Debug)]
pub struct ToolLocator {
    search_paths: Vec<PathBuf>,
    path_lookup: bool,
    cache: RwLock<HashMap<String, PathBuf>>,
}

impl ToolLocator {
    pub fn new<I, P>(search_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            search_paths: search_paths.into_iter().map(Into::into).collect(),
            path_lookup: true,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(config.search_paths.iter().map(PathBuf::from))
    }

    /// Skip the PATH lookup and only scan the search directories
    pub fn without_path_lookup(mut self) -> Self {
        self.path_lookup = false;
        self
    }

    /// Resolve a tool name to an absolute executable path.
    ///
    /// Order: cache, PATH lookup, then each configured search directory.
    /// Misses are not cached.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if let Some(path) = self.cached(name) {
            return Some(path);
        }

        if self.path_lookup {
            if let Ok(path) = which::which(name) {
                if is_executable_file(&path) {
                    log::debug!("Found {} at {}", name, path.display());
                    return Some(self.register(name, path));
                }
            }
        }

        for dir in &self.search_paths {
            let candidate = dir.join(name);
            if is_executable_file(&candidate) {
                log::debug!("Found {} at {} (fallback)", name, candidate.display());
                return Some(self.register(name, candidate));
            }
        }

        log::debug!("Tool {} not found in PATH or standard locations", name);
        None
    }

    /// Cache-only lookup; never touches the filesystem.
    pub fn cached(&self, name: &str) -> Option<PathBuf> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache.get(name).cloned()
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.cached(name).is_some()
    }

    /// Record a known location. An existing entry is kept and returned.
    pub fn register(&self, name: &str, path: impl Into<PathBuf>) -> PathBuf {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.entry(name.to_string()).or_insert_with(|| path.into()).clone()
    }

    /// Resolve every required and optional tool, populating the cache.
    pub fn check_dependencies(&self) -> DependencyReport {
        let mut report = DependencyReport::default();

        for tool in REQUIRED_TOOLS {
            if self.resolve(tool).is_none() {
                log::warn!("Required tool {} not found in PATH or standard locations", tool);
                report.missing.push(tool.to_string());
            }
        }

        for tool in OPTIONAL_TOOLS {
            if self.resolve(tool).is_none() {
                log::warn!("Tool {} not found in PATH or standard locations", tool);
                report.optional.push(tool.to_string());
            }
        }

        report
    }

    /// All resolved tools, sorted by name
    pub fn tool_paths(&self) -> BTreeMap<String, PathBuf> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn environment_info(&self) -> EnvironmentInfo {
        let var = |key: &str| std::env::var(key).unwrap_or_default();
        EnvironmentInfo {
            path: var("PATH"),
            user: std::env::var("USER").unwrap_or_else(|_| "unknown".into()),
            home: var("HOME"),
            shell: var("SHELL"),
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_default(),
            is_systemd: Path::new("/run/systemd/system").exists(),
            is_cron: !std::io::stdout().is_terminal(),
            tool_paths: self.tool_paths(),
        }
    }
}

impl Default for ToolLocator {
    fn default() -> Self {
        Self::from_config(&ToolsConfig::default())
    }
}

/// Regular file with the execute permission for the current user
pub fn is_executable_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        nix::unistd::access(path, nix::unistd::AccessFlags::X_OK).is_ok()
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Whether the process runs with an effective UID of 0
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        nix::unistd::geteuid().is_root()
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn make_tool(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn test_resolve_from_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = make_tool(dir.path(), "dhc-test-fakectl", 0o755);
        let locator = ToolLocator::new([dir.path()]);

        assert_eq!(locator.resolve("dhc-test-fakectl"), Some(tool.clone()));
        assert_eq!(locator.cached("dhc-test-fakectl"), Some(tool));
    }

    #[test]
    fn test_non_executable_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        make_tool(dir.path(), "dhc-test-noexec", 0o644);
        let locator = ToolLocator::new([dir.path()]);

        assert_eq!(locator.resolve("dhc-test-noexec"), None);
        assert!(!locator.is_available("dhc-test-noexec"));
    }

    #[test]
    fn test_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("dhc-test-dir")).unwrap();
        let locator = ToolLocator::new([dir.path()]);
        assert_eq!(locator.resolve("dhc-test-dir"), None);
    }

    #[test]
    fn test_first_search_path_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let expected = make_tool(first.path(), "dhc-test-dup", 0o755);
        make_tool(second.path(), "dhc-test-dup", 0o755);
        let locator = ToolLocator::new([first.path(), second.path()]);

        assert_eq!(locator.resolve("dhc-test-dup"), Some(expected));
    }

    #[test]
    fn test_misses_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ToolLocator::new([dir.path()]);
        assert_eq!(locator.resolve("dhc-test-late"), None);

        let tool = make_tool(dir.path(), "dhc-test-late", 0o755);
        assert_eq!(locator.resolve("dhc-test-late"), Some(tool));
    }

    #[test]
    fn test_cache_survives_tool_removal() {
        let dir = tempfile::tempdir().unwrap();
        let tool = make_tool(dir.path(), "dhc-test-gone", 0o755);
        let locator = ToolLocator::new([dir.path()]);
        assert_eq!(locator.resolve("dhc-test-gone"), Some(tool.clone()));

        std::fs::remove_file(&tool).unwrap();
        assert_eq!(locator.resolve("dhc-test-gone"), Some(tool));
    }

    #[test]
    fn test_without_path_lookup_ignores_path() {
        let locator = ToolLocator::new(Vec::<PathBuf>::new()).without_path_lookup();
        assert_eq!(locator.resolve("sh"), None);

        let report = locator.check_dependencies();
        assert_eq!(report.missing, ["lsblk"]);
        assert!(!report.is_satisfied());
    }

    #[test]
    fn test_register_keeps_first_entry() {
        let locator = ToolLocator::new(Vec::<PathBuf>::new());
        assert_eq!(locator.register("blkid", "/sbin/blkid"), PathBuf::from("/sbin/blkid"));
        assert_eq!(locator.register("blkid", "/usr/sbin/blkid"), PathBuf::from("/sbin/blkid"));
        assert!(locator.is_available("blkid"));
    }

    #[test]
    fn test_check_dependencies_with_empty_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ToolLocator::new([dir.path()]);
        let report = locator.check_dependencies();
        // Results depend on the host PATH; every tool lands in exactly one place.
        for tool in REQUIRED_TOOLS {
            assert_eq!(report.missing.contains(&tool.to_string()), !locator.is_available(tool));
        }
        for tool in OPTIONAL_TOOLS {
            assert_eq!(report.optional.contains(&tool.to_string()), !locator.is_available(tool));
        }
    }

    #[test]
    fn test_environment_info_lists_resolved_tools() {
        let dir = tempfile::tempdir().unwrap();
        let tool = make_tool(dir.path(), "dhc-test-env", 0o755);
        let locator = ToolLocator::new([dir.path()]);
        locator.resolve("dhc-test-env");

        let info = locator.environment_info();
        assert_eq!(info.tool_paths.get("dhc-test-env"), Some(&tool));
    }
}
