//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ipfilter::clock::FixedClock;
use ipfilter::cmd_abstraction::{CommandError, CommandExecutor, CommandOutput};
use ipfilter::config::{FirewallConfig, Wrapper};
use ipfilter::enforcer::RuleCommand;
use ipfilter::Registry;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Executor that records every command line and fails on request.
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<String>>,
    fail_matching: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingExecutor {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every command whose line contains `needle` exit with status 1.
    pub fn fail_matching(&self, needle: &str) {
        *self.fail_matching.lock().unwrap() = Some(needle.to_string());
    }

    pub fn succeed(&self) {
        *self.fail_matching.lock().unwrap() = None;
    }

    /// Hold every command for `delay` (or until cancelled).
    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(
        &self,
        cmd: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, CommandError> {
        let line = std::iter::once(cmd.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(CommandError::Cancelled),
            }
        }

        let fail = self
            .fail_matching
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|needle| line.contains(needle));
        if fail {
            return Ok(CommandOutput {
                stderr: "ERROR: rule rejected".to_string(),
                success: false,
                code: Some(1),
                ..Default::default()
            });
        }

        Ok(CommandOutput {
            stdout: "Rule added".to_string(),
            success: true,
            code: Some(0),
            ..Default::default()
        })
    }
}

pub struct Fixture {
    pub clock: Arc<FixedClock>,
    pub executor: Arc<RecordingExecutor>,
    pub registry: Arc<Registry>,
}

pub fn fixture(start: &str) -> Fixture {
    let clock = Arc::new(FixedClock::at(start).unwrap());
    let executor = Arc::new(RecordingExecutor::default());
    let registry = Arc::new(Registry::new(
        clock.clone(),
        executor.clone(),
        RuleCommand::new(Wrapper::None, FirewallConfig::default()),
    ));
    Fixture {
        clock,
        executor,
        registry,
    }
}
