// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Canned-output executor for exercising the pipeline without hardware

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{CommandExecutor, CommandOutcome};

/// Answers commands from a table keyed by the space-joined argv.
///
/// Unknown commands come back as `NotFound`. Every call is recorded.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    responses: HashMap<String, CommandOutcome>,
    delays: HashMap<String, Duration>,
    panics: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, outcome: CommandOutcome) -> Self {
        self.responses.insert(command.to_string(), outcome);
        self
    }

    /// Shorthand for a completed run with exit code 0
    pub fn ok(self, command: &str, stdout: &str) -> Self {
        self.respond(command, CommandOutcome::completed(stdout, "", 0))
    }

    pub fn delay(mut self, command: &str, delay: Duration) -> Self {
        self.delays.insert(command.to_string(), delay);
        self
    }

    /// Panic inside `run` for this command
    pub fn panic_on(mut self, command: &str) -> Self {
        self.panics.push(command.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, command: &str) -> bool {
        self.calls().iter().any(|c| c == command)
    }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    async fn run(&self, argv: &[String], _timeout: Option<Duration>) -> CommandOutcome {
        let key = argv.join(" ");
        self.calls.lock().unwrap().push(key.clone());

        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        if self.panics.contains(&key) {
            panic!("fake executor asked to fail on {}", key);
        }

        self.responses
            .get(&key)
            .cloned()
            .unwrap_or_else(|| CommandOutcome::NotFound {
                program: argv.first().cloned().unwrap_or_default(),
            })
    }
}
