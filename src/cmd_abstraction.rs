//! Command execution abstraction for testability.
//!
//! This module provides a trait-based abstraction over external process
//! execution, allowing unit tests to mock firewall command calls without
//! actually running them. Every invocation is cancellable and bounded by a
//! timeout; a cancelled or timed-out child process is killed.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
use mockall::automock;

/// Default upper bound for a single external command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Output from command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// The exit code, if available
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Standard output followed by standard error.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Why an external command did not complete successfully.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command exited with status {}: {output}", code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    Failed { code: Option<i32>, output: String },

    #[error("command cancelled")]
    Cancelled,

    #[error("command timed out after {0:?}")]
    TimedOut(Duration),
}

/// Trait for command execution, allowing dependency injection for testing.
///
/// The real implementation spawns actual processes, while tests can use
/// mock implementations to control command behavior. Implementations report a
/// non-zero exit through `CommandOutput::success`; callers decide whether that
/// is an error.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute `cmd` with `args`, aborting when `cancel` fires.
    async fn execute(
        &self,
        cmd: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, CommandError>;
}

/// Real implementation of CommandExecutor backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct TokioCommandExecutor {
    timeout: Duration,
}

impl TokioCommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl CommandExecutor for TokioCommandExecutor {
    async fn execute(
        &self,
        cmd: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, CommandError> {
        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled);
        }

        let child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: cmd.to_string(),
                source,
            })?;

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            output = child.wait_with_output() => output.map_err(|source| CommandError::Spawn {
                program: cmd.to_string(),
                source,
            })?,
            _ = cancel.cancelled() => return Err(CommandError::Cancelled),
            _ = tokio::time::sleep(self.timeout) => return Err(CommandError::TimedOut(self.timeout)),
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn args_to_strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_args_to_strings() {
        let args = args_to_strings(&["allow", "from", "1.2.3.4"]);
        assert_eq!(args, vec!["allow", "from", "1.2.3.4"]);
    }

    #[test]
    fn test_command_output_default() {
        let output = CommandOutput::default();
        assert!(output.stdout.is_empty());
        assert!(output.stderr.is_empty());
        assert!(!output.success);
        assert!(output.code.is_none());
        assert!(output.combined().is_empty());
    }

    #[test]
    fn test_combined_output() {
        let output = CommandOutput {
            stdout: "Rule added\n".to_string(),
            stderr: "WARN: something".to_string(),
            success: true,
            code: Some(0),
        };
        assert_eq!(output.combined(), "Rule added\nWARN: something");

        let only_err = CommandOutput {
            stderr: "ERROR".to_string(),
            ..Default::default()
        };
        assert_eq!(only_err.combined(), "ERROR");
    }

    #[test]
    fn test_failed_display() {
        let err = CommandError::Failed {
            code: Some(1),
            output: "ERROR: bad rule".to_string(),
        };
        assert_eq!(err.to_string(), "command exited with status 1: ERROR: bad rule");

        let err = CommandError::Failed {
            code: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }

    #[tokio::test]
    async fn test_tokio_executor_echo() {
        let executor = TokioCommandExecutor::default();
        let args = args_to_strings(&["-n", "hello"]);
        let output = executor
            .execute("echo", &args, &CancellationToken::new())
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.code, Some(0));
        assert_eq!(output.stdout, "hello");
    }

    #[tokio::test]
    async fn test_tokio_executor_nonzero_exit() {
        let executor = TokioCommandExecutor::default();
        let output = executor
            .execute("false", &[], &CancellationToken::new())
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.code, Some(1));
    }

    #[tokio::test]
    async fn test_tokio_executor_missing_program() {
        let executor = TokioCommandExecutor::default();
        let result = executor
            .execute("/nonexistent/ipfilter-test-binary", &[], &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(CommandError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_tokio_executor_already_cancelled() {
        let executor = TokioCommandExecutor::default();
        let token = CancellationToken::new();
        token.cancel();
        let result = executor.execute("echo", &[], &token).await;
        assert!(matches!(result, Err(CommandError::Cancelled)));
    }

    #[tokio::test]
    async fn test_tokio_executor_cancel_kills_child() {
        let executor = TokioCommandExecutor::default();
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let args = args_to_strings(&["5"]);
        let result = executor.execute("sleep", &args, &token).await;
        assert!(matches!(result, Err(CommandError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_tokio_executor_timeout() {
        let executor = TokioCommandExecutor::new(Duration::from_millis(50));
        let args = args_to_strings(&["5"]);
        let result = executor
            .execute("sleep", &args, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(CommandError::TimedOut(_))));
    }

    #[tokio::test]
    async fn test_mock_command_executor() {
        let mut mock = MockCommandExecutor::new();

        mock.expect_execute()
            .withf(|cmd, args, _| cmd == "ufw" && args == ["status".to_string()])
            .times(1)
            .returning(|_, _, _| {
                Ok(CommandOutput {
                    stdout: "Status: active".to_string(),
                    stderr: String::new(),
                    success: true,
                    code: Some(0),
                })
            });

        let args = vec!["status".to_string()];
        let output = mock
            .execute("ufw", &args, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output.stdout, "Status: active");
        assert!(output.success);
    }
}
