// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Bounded execution of external diagnostic commands
//!
//! Every invocation yields a [`CommandOutcome`]; timeouts, missing programs
//! and OS-level spawn failures are values, not errors. Tools such as
//! `smartctl` use non-zero exit codes as status bitmasks, so a completed run
//! is reported with whatever code it returned.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tools::ToolLocator;

#[cfg(test)]
pub(crate) mod fake;

/// Legacy numeric sentinel for a timed-out command
pub const EXIT_TIMEOUT: i32 = -1;
/// Legacy numeric sentinel for a program that could not be found
pub const EXIT_NOT_FOUND: i32 = -2;
/// Legacy numeric sentinel for any other execution failure
pub const EXIT_EXECUTION_ERROR: i32 = -3;

/// Outcome of running one external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutcome {
    /// The program ran to completion (exit code may be non-zero)
    Completed {
        stdout: String,
        stderr: String,
        exit_code: i32,
    },
    /// Wall-clock timeout expired; the child was killed
    TimedOut,
    /// The program does not exist
    NotFound { program: String },
    /// Spawning or waiting failed for another reason
    ExecutionError { detail: String },
}

impl CommandOutcome {
    pub fn completed(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self::Completed {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn stdout(&self) -> &str {
        match self {
            Self::Completed { stdout, .. } => stdout,
            _ => "",
        }
    }

    /// Captured stderr, or a sentinel message describing the failure
    pub fn stderr(&self) -> String {
        match self {
            Self::Completed { stderr, .. } => stderr.clone(),
            Self::TimedOut => "Timeout".to_string(),
            Self::NotFound { program } => format!("Command not found: {}", program),
            Self::ExecutionError { detail } => detail.clone(),
        }
    }

    /// Exit code with legacy negative sentinels for failures
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { exit_code, .. } => *exit_code,
            Self::TimedOut => EXIT_TIMEOUT,
            Self::NotFound { .. } => EXIT_NOT_FOUND,
            Self::ExecutionError { .. } => EXIT_EXECUTION_ERROR,
        }
    }

    /// Completed with exit code 0
    pub fn success(&self) -> bool {
        matches!(self, Self::Completed { exit_code: 0, .. })
    }
}

/// Seam between the analysis pipeline and process execution.
///
/// `argv[0]` is the logical tool name; implementations decide how to locate it.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `argv`, bounded by `timeout` or the executor's default.
    async fn run(&self, argv: &[String], timeout: Option<Duration>) -> CommandOutcome;
}

/// Production executor backed by `tokio::process`
#[derive(Debug, Clone)]
pub struct CommandRunner {
    locator: Arc<ToolLocator>,
    default_timeout: Duration,
}

impl CommandRunner {
    pub fn new(locator: Arc<ToolLocator>, default_timeout: Duration) -> Self {
        Self {
            locator,
            default_timeout,
        }
    }

    pub fn locator(&self) -> &Arc<ToolLocator> {
        &self.locator
    }

    /// Swap `argv[0]` for its cached absolute path when one is known.
    ///
    /// Only the cache is consulted; tools are resolved once per run by
    /// [`ToolLocator::check_dependencies`].
    fn program_path(&self, program: &str) -> String {
        let tool_name = Path::new(program)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| program.to_string());
        match self.locator.cached(&tool_name) {
            Some(path) => path.to_string_lossy().to_string(),
            None => program.to_string(),
        }
    }
}

#[async_trait]
impl CommandExecutor for CommandRunner {
    async fn run(&self, argv: &[String], timeout: Option<Duration>) -> CommandOutcome {
        let Some((program, args)) = argv.split_first() else {
            return CommandOutcome::ExecutionError {
                detail: "empty command line".into(),
            };
        };
        let timeout = timeout.unwrap_or(self.default_timeout);
        let program = self.program_path(program);
        let display = std::iter::once(program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        log::debug!("Executing: {}", display);

        let mut command = tokio::process::Command::new(&program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(timeout, command.output()).await {
            Err(_) => {
                log::warn!("Command timed out: {}", display);
                CommandOutcome::TimedOut
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::error!("Command not found: {}", program);
                CommandOutcome::NotFound { program }
            }
            Ok(Err(e)) => {
                log::error!("Command failed: {}", e);
                CommandOutcome::ExecutionError {
                    detail: e.to_string(),
                }
            }
            Ok(Ok(output)) => match output.status.code() {
                Some(exit_code) => {
                    log::debug!("Return code: {}", exit_code);
                    CommandOutcome::Completed {
                        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                        exit_code,
                    }
                }
                None => {
                    log::error!("Command terminated by signal: {}", display);
                    CommandOutcome::ExecutionError {
                        detail: format!("{} terminated by signal", program),
                    }
                }
            },
        }
    }
}

/// Build an owned argv from string slices
pub fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> CommandRunner {
        CommandRunner::new(Arc::new(ToolLocator::default()), Duration::from_secs(5))
    }

    #[test]
    fn test_outcome_sentinels() {
        assert_eq!(CommandOutcome::TimedOut.stderr(), "Timeout");
        assert_eq!(CommandOutcome::TimedOut.exit_code(), EXIT_TIMEOUT);

        let missing = CommandOutcome::NotFound {
            program: "smartctl".into(),
        };
        assert_eq!(missing.stderr(), "Command not found: smartctl");
        assert_eq!(missing.exit_code(), EXIT_NOT_FOUND);
        assert_eq!(missing.stdout(), "");

        let failed = CommandOutcome::ExecutionError {
            detail: "permission denied".into(),
        };
        assert_eq!(failed.exit_code(), EXIT_EXECUTION_ERROR);
        assert!(!failed.success());
    }

    #[test]
    fn test_completed_nonzero_is_not_success() {
        let outcome = CommandOutcome::completed("out", "err", 4);
        assert_eq!(outcome.stdout(), "out");
        assert_eq!(outcome.stderr(), "err");
        assert_eq!(outcome.exit_code(), 4);
        assert!(!outcome.success());
        assert!(CommandOutcome::completed("", "", 0).success());
    }

    #[tokio::test]
    async fn test_run_captures_output() {
        let outcome = runner()
            .run(&argv(["sh", "-c", "echo hello; echo oops >&2; exit 3"]), None)
            .await;
        assert_eq!(outcome.stdout().trim(), "hello");
        assert_eq!(outcome.stderr().trim(), "oops");
        assert_eq!(outcome.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let started = std::time::Instant::now();
        let outcome = runner()
            .run(&argv(["sleep", "5"]), Some(Duration::from_millis(100)))
            .await;
        assert_eq!(outcome, CommandOutcome::TimedOut);
        assert_eq!(outcome.stderr(), "Timeout");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let outcome = runner()
            .run(&argv(["dhc-definitely-not-a-real-tool"]), None)
            .await;
        assert!(matches!(outcome, CommandOutcome::NotFound { .. }));
        assert_eq!(outcome.exit_code(), EXIT_NOT_FOUND);
        assert!(outcome.stderr().starts_with("Command not found"));
    }

    #[tokio::test]
    async fn test_run_empty_argv() {
        let outcome = runner().run(&[], None).await;
        assert!(matches!(outcome, CommandOutcome::ExecutionError { .. }));
    }

    #[tokio::test]
    async fn test_run_uses_cached_path_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-lsblk");
        std::fs::write(&script, "#!/bin/sh\necho cached\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let runner = runner();
        runner.locator().register("lsblk", &script);
        let outcome = runner.run(&argv(["lsblk", "-dJ"]), None).await;
        assert_eq!(outcome.stdout().trim(), "cached");

        // Uncached names are spawned as given and never looked up
        let outcome = runner.run(&argv(["sh", "-c", "exit 0"]), None).await;
        assert!(outcome.success());
        assert_eq!(runner.locator().cached("sh"), None);
    }

    #[tokio::test]
    async fn test_explicit_path_is_accepted() {
        let outcome = runner().run(&argv(["/bin/sh", "-c", "exit 0"]), None).await;
        assert!(outcome.success());
    }
}
