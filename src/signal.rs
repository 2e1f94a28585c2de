//! Signal handling for graceful shutdown.
//!
//! SIGINT and SIGTERM cancel one process-wide [`CancellationToken`]; the
//! eviction scheduler and the HTTP server each observe a clone of it.

use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{info, warn};

/// Spawn a task that cancels `shutdown` on SIGINT or SIGTERM.
///
/// If signal handlers cannot be registered (e.g., in restricted environments),
/// the task logs a warning and the token can still be cancelled manually.
/// The task also ends when `shutdown` is cancelled by someone else.
pub fn spawn_signal_listener(shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        // Try to register signal handlers - may fail in containers or restricted envs
        let sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Failed to register SIGINT handler: {}", e);
                None
            }
        };

        let sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                None
            }
        };

        match (sigint, sigterm) {
            (Some(mut int), Some(mut term)) => {
                tokio::select! {
                    _ = int.recv() => info!("Received SIGINT, initiating graceful shutdown..."),
                    _ = term.recv() => info!("Received SIGTERM, initiating graceful shutdown..."),
                    _ = shutdown.cancelled() => return,
                }
            }
            (Some(mut int), None) => {
                tokio::select! {
                    _ = int.recv() => info!("Received SIGINT, initiating graceful shutdown..."),
                    _ = shutdown.cancelled() => return,
                }
            }
            (None, Some(mut term)) => {
                tokio::select! {
                    _ = term.recv() => info!("Received SIGTERM, initiating graceful shutdown..."),
                    _ = shutdown.cancelled() => return,
                }
            }
            (None, None) => {
                warn!("No signal handlers registered - graceful shutdown on signal disabled");
                return;
            }
        }

        shutdown.cancel();
    })
}

/// A child token that cancels itself after a fixed delay.
///
/// Cancelling the parent cancels the deadline too. Dropping the deadline
/// cancels the token and stops its timer.
pub struct Deadline {
    token: CancellationToken,
    _guard: DropGuard,
}

impl Deadline {
    pub fn new(parent: &CancellationToken, after: Duration) -> Self {
        let token = parent.child_token();
        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(after) => timer.cancel(),
                _ = timer.cancelled() => {}
            }
        });

        Self {
            _guard: token.clone().drop_guard(),
            token,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
