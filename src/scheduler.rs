//! Periodic eviction of stale allow-list entries.
//!
//! The scheduler is `Running` from the moment [`EvictionScheduler::run`] is
//! entered until the shutdown token fires; it then logs the final registry
//! snapshot and moves to `Stopped`. Eviction errors are logged and retried on
//! the next pass, never fatal.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::PartialEviction;
use crate::registry::{IpEntry, Registry};
use crate::signal::Deadline;

/// Eviction knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Entries not refreshed within this window are evicted
    pub ttl: Duration,
    /// Delay between passes
    pub poll_interval: Duration,
    /// Deadline for one pass, including the wait for the mutation lock
    pub iteration_timeout: Duration,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(15),
            poll_interval: Duration::from_secs(1),
            iteration_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

pub struct EvictionScheduler {
    registry: Arc<Registry>,
    policy: EvictionPolicy,
    state: watch::Sender<SchedulerState>,
}

impl EvictionScheduler {
    pub fn new(registry: Arc<Registry>, policy: EvictionPolicy) -> Self {
        let (state, _) = watch::channel(SchedulerState::Stopped);
        Self {
            registry,
            policy,
            state,
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Watch state transitions, e.g. to wait for `Stopped`.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// One eviction pass bounded by `iteration_timeout`.
    pub async fn run_once(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<Vec<IpEntry>, PartialEviction> {
        let deadline = Deadline::new(shutdown, self.policy.iteration_timeout);
        let result = self
            .registry
            .delete_out_of_date(self.policy.ttl, deadline.token())
            .await;

        match &result {
            Ok(removed) if !removed.is_empty() => {
                info!("Deleted out-of-date entries: {:?}", removed);
            }
            Ok(_) => debug!("No out-of-date entries"),
            Err(e) => {
                if !e.removed.is_empty() {
                    info!("Deleted out-of-date entries: {:?}", e.removed);
                }
                error!("Eviction pass failed: {}", e.source);
            }
        }

        result
    }

    /// Run until `shutdown` fires; returns the final registry snapshot.
    pub async fn run(self, shutdown: CancellationToken) -> Vec<IpEntry> {
        self.state.send_replace(SchedulerState::Running);
        info!(
            "Eviction scheduler started (ttl={:?}, poll={:?})",
            self.policy.ttl, self.policy.poll_interval
        );

        loop {
            let _ = self.run_once(&shutdown).await;

            tokio::select! {
                _ = tokio::time::sleep(self.policy.poll_interval) => {}
                _ = shutdown.cancelled() => {
                    info!("Eviction scheduler: shutdown requested");
                    break;
                }
            }
        }

        let snapshot = self.registry.list();
        info!("Firewall entries: {:?}", snapshot);
        self.state.send_replace(SchedulerState::Stopped);
        snapshot
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<Vec<IpEntry>> {
        tokio::spawn(self.run(shutdown))
    }
}
