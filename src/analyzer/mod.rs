// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Per-drive analysis and the bounded parallel orchestrator
//!
//! Each drive is analyzed on its own task: SMART health, attributes and
//! temperature, then partitions and usage, then optional I/O counters, and
//! finally scoring. At most `performance.max_workers` drives are in flight.
//! Reports are returned in completion order; a drive whose task fails is
//! logged and left out without disturbing the others.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::HealthConfig;
use crate::devices::{get_partitions, Device, MountUsage, PartitionScan};
use crate::error::HealthError;
use crate::extract::iostats::DISKSTATS_PATH;
use crate::extract::{
    get_io_stats, get_smart_attributes, get_smart_health, get_temperature, IoStats,
    SmartAttributes,
};
use crate::runner::CommandExecutor;
use crate::scoring::{score, Assessment, DeviceClass, DeviceFacts, Issue};
use crate::tools::ToolLocator;

/// Which fact groups to collect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisScope {
    pub smart: bool,
    pub usage: bool,
}

impl Default for AnalysisScope {
    fn default() -> Self {
        Self {
            smart: true,
            usage: true,
        }
    }
}

impl AnalysisScope {
    pub fn smart_only() -> Self {
        Self {
            smart: true,
            usage: false,
        }
    }

    pub fn usage_only() -> Self {
        Self {
            smart: false,
            usage: true,
        }
    }
}

/// Completed analysis of one drive
#[derive(Debug, Clone)]
pub struct DeviceReport {
    pub device: Device,
    pub facts: DeviceFacts,
    pub mount_points: Vec<MountUsage>,
    pub io_stats: Option<IoStats>,
    pub assessment: Assessment,
    pub scan_time: Duration,
}

impl DeviceReport {
    pub fn score(&self) -> u64 {
        self.assessment.score
    }

    pub fn issues(&self) -> &[Issue] {
        &self.assessment.issues
    }

    pub fn class(&self, config: &HealthConfig) -> DeviceClass {
        DeviceClass::classify(self.score(), &config.thresholds)
    }
}

/// Receives progress while [`DiskAnalyzer::analyze_all`] runs.
///
/// Called from the collecting task only, never concurrently.
pub trait ProgressObserver {
    fn on_start(&self, _total: usize) {}

    fn on_device_done(&self, report: &DeviceReport);

    fn on_device_failed(&self, _device: &str, _reason: &str) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_device_done(&self, _report: &DeviceReport) {}
}

/// Runs the per-drive pipeline against an executor
pub struct DiskAnalyzer {
    exec: Arc<dyn CommandExecutor>,
    locator: Arc<ToolLocator>,
    config: Arc<HealthConfig>,
    scope: AnalysisScope,
    diskstats_path: PathBuf,
}

impl DiskAnalyzer {
    pub fn new(
        exec: Arc<dyn CommandExecutor>,
        locator: Arc<ToolLocator>,
        config: Arc<HealthConfig>,
    ) -> Self {
        Self {
            exec,
            locator,
            config,
            scope: AnalysisScope::default(),
            diskstats_path: PathBuf::from(DISKSTATS_PATH),
        }
    }

    pub fn with_scope(mut self, scope: AnalysisScope) -> Self {
        self.scope = scope;
        self
    }

    /// Read I/O counters from another file instead of `/proc/diskstats`
    pub fn with_diskstats_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.diskstats_path = path.into();
        self
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Collect facts for one drive and score them
    pub async fn analyze_disk(&self, device: &Device) -> DeviceReport {
        let started = Instant::now();
        log::info!("Analyzing disk: /dev/{}", device.name);
        let exec = self.exec.as_ref();

        let mut facts = DeviceFacts::default();
        if self.scope.smart {
            let health = get_smart_health(exec, &device.name).await;
            facts.smart_attrs = if health.allows_attribute_query() {
                get_smart_attributes(exec, &device.name).await
            } else {
                SmartAttributes::new()
            };
            facts.smart_health = Some(health);
            facts.temperature = get_temperature(exec, &device.name).await;
        }

        let mut scan = PartitionScan::default();
        if self.scope.usage {
            scan = get_partitions(
                exec,
                &self.locator,
                &self.config.filesystem,
                &device.name,
                self.config.performance.command_timeout(),
            )
            .await;
        }
        facts.usage = scan.max_usage;
        facts.partitions = scan.partitions;

        let io_stats = if self.config.output.show_io_stats {
            get_io_stats(&self.diskstats_path, &device.name).await
        } else {
            None
        };

        let assessment = score(&facts, &self.config.thresholds);
        let scan_time = started.elapsed();
        log::info!(
            "Disk {} analyzed in {:.2}s, score: {}",
            device.name,
            scan_time.as_secs_f64(),
            assessment.score
        );

        DeviceReport {
            device: device.clone(),
            facts,
            mount_points: scan.mount_points,
            io_stats,
            assessment,
            scan_time,
        }
    }

    /// Analyze every drive with at most `max_workers` in flight.
    ///
    /// Dropping the returned future aborts all outstanding drive tasks.
    pub async fn analyze_all(
        self: &Arc<Self>,
        devices: Vec<Device>,
        observer: &dyn ProgressObserver,
    ) -> Vec<DeviceReport> {
        let workers = self.config.performance.max_workers.max(1);
        let permits = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();

        observer.on_start(devices.len());
        for device in devices {
            let analyzer = Arc::clone(self);
            let permits = Arc::clone(&permits);
            let name = device.name.clone();
            let handle = tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                analyzer.analyze_disk(&device).await
            });
            names.insert(handle.id(), name);
        }

        let mut reports = Vec::with_capacity(names.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, report)) => {
                    observer.on_device_done(&report);
                    reports.push(report);
                }
                Err(e) => {
                    let device = names.get(&e.id()).cloned().unwrap_or_default();
                    let reason = if e.is_panic() {
                        "analysis task panicked".to_string()
                    } else {
                        e.to_string()
                    };
                    let fault = HealthError::Analysis {
                        device: device.clone(),
                        reason,
                    };
                    log::error!("{}", fault);
                    observer.on_device_failed(&device, &fault.to_string());
                }
            }
        }

        reports
    }
}
