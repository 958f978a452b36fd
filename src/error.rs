// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Error types for Disk Health Checker

use std::io;
use thiserror::Error;

/// Result type alias for disk health operations
pub type Result<T> = std::result::Result<T, HealthError>;

/// Errors surfaced by the library.
///
/// Failures of individual external commands are not errors: they come back as
/// [`CommandOutcome`](crate::runner::CommandOutcome) values and degrade the
/// affected fact to "absent".
#[derive(Error, Debug)]
pub enum HealthError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Required external tools could not be resolved
    #[error("Missing required tools: {}", .0.join(", "))]
    DependencyMissing(Vec<String>),

    /// Enumeration produced no physical drives
    #[error("No physical drives found")]
    NoDevices,

    /// Analysis of a single device failed
    #[error("Failed to analyze disk {device}: {reason}")]
    Analysis { device: String, reason: String },
}
