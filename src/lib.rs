// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! # Disk Health Checker
//!
//! Inspects every physical drive on a Linux host and reduces what it finds to
//! one risk score per drive: higher means more urgent.
//!
//! Facts come from standard system tools (`lsblk`, `smartctl`, `blkid`,
//! `dumpe2fs`) and from `statvfs(3)` and `/proc/diskstats`:
//!
//! - S.M.A.R.T. overall health, critical attribute counters and temperature
//! - usage of mounted partitions
//! - recorded state and mount counters of unmounted filesystems
//! - optional cumulative I/O counters
//!
//! Drives are analyzed concurrently on a bounded pool. Every external command
//! is time bounded and its failure only removes the fact it would have
//! provided.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dhclib::analyzer::{DiskAnalyzer, NoProgress};
//! use dhclib::config::HealthConfig;
//! use dhclib::devices::list_devices;
//! use dhclib::runner::CommandRunner;
//! use dhclib::tools::ToolLocator;
//!
//! # async fn run() {
//! let config = Arc::new(HealthConfig::default());
//! let locator = Arc::new(ToolLocator::from_config(&config.tools));
//! locator.check_dependencies();
//! let runner = Arc::new(CommandRunner::new(
//!     locator.clone(),
//!     config.performance.command_timeout(),
//! ));
//!
//! let devices = list_devices(runner.as_ref()).await;
//! let analyzer = Arc::new(DiskAnalyzer::new(runner, locator, config));
//! for report in analyzer.analyze_all(devices, &NoProgress).await {
//!     println!("/dev/{}: score {}", report.device.name, report.score());
//! }
//! # }
//! ```

pub mod analyzer;
pub mod check;
pub mod config;
pub mod devices;
pub mod error;
pub mod extract;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod tools;

pub use analyzer::{AnalysisScope, DeviceReport, DiskAnalyzer, ProgressObserver};
pub use check::{run_check, CheckOptions, OutputFormat};
pub use config::HealthConfig;
pub use devices::{list_devices, Device, Partition};
pub use error::{HealthError, Result};
pub use extract::SmartHealth;
pub use runner::{CommandExecutor, CommandOutcome, CommandRunner};
pub use scoring::{score, Assessment, DeviceClass, DeviceFacts, Issue, Severity};
pub use tools::ToolLocator;
