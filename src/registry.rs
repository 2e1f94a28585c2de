//! Allow-list registry.
//!
//! Owns the set of currently allowed IPs and keeps the firewall in step with
//! it. Every mutation (add, delete, eviction) is serialised on an async lock
//! that is held across the external firewall command, so two commands for
//! the registry never interleave. The entry vector itself sits behind a
//! separate short-lived lock: [`Registry::list`] never waits for a command.
//!
//! Failed firewall commands are compensated: a failed allow drops the new
//! entry again, a failed remove puts the entry back where it was. The
//! compensation lives in a drop guard, so it also runs when the mutation
//! future is dropped mid-command. The registry therefore only holds entries
//! whose last firewall command succeeded.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::MutexGuard as MutationGuard;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::cmd_abstraction::{CommandError, CommandExecutor};
use crate::enforcer::{RuleAction, RuleCommand};
use crate::error::{AllowlistError, PartialEviction};
use crate::validation::canonical_ip;

/// One allow-list record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpEntry {
    /// Canonical IP literal; unique within the registry
    pub ip: String,
    /// When the entry was first admitted
    pub created_at: DateTime<Utc>,
    /// Last refresh (re-add) or creation
    pub updated_at: DateTime<Utc>,
}

pub struct Registry {
    entries: Mutex<Vec<IpEntry>>,
    mutation: tokio::sync::Mutex<()>,
    clock: Arc<dyn Clock>,
    executor: Arc<dyn CommandExecutor>,
    rules: RuleCommand,
}

impl Registry {
    pub fn new(
        clock: Arc<dyn Clock>,
        executor: Arc<dyn CommandExecutor>,
        rules: RuleCommand,
    ) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            mutation: tokio::sync::Mutex::new(()),
            clock,
            executor,
            rules,
        }
    }

    /// Admit `ip`, or refresh it when already present.
    ///
    /// A refresh only moves `updated_at`; no firewall command runs.
    pub async fn add_ip(&self, ip: &str, cancel: &CancellationToken) -> Result<(), AllowlistError> {
        let ip = canonical_ip(ip)?;
        let _mutation = self.lock_mutation(cancel).await?;
        let now = self.clock.now();

        {
            let mut entries = self.entries();
            if let Some(entry) = entries.iter_mut().find(|e| e.ip == ip) {
                entry.updated_at = entry.updated_at.max(now);
                debug!("Refreshed {} (updated_at={})", ip, entry.updated_at);
                return Ok(());
            }
            entries.push(IpEntry {
                ip: ip.clone(),
                created_at: now,
                updated_at: now,
            });
        }

        let rollback = Rollback::new(self, Undo::Forget(ip.clone()));
        self.run_rule(RuleAction::Allow, &ip, cancel).await?;
        rollback.disarm();

        info!("Allowed {}", ip);
        Ok(())
    }

    /// Remove `ip` and its firewall rule.
    pub async fn delete_ip(&self, ip: &str, cancel: &CancellationToken) -> Result<(), AllowlistError> {
        let ip = canonical_ip(ip)?;
        let _mutation = self.lock_mutation(cancel).await?;
        self.remove_locked(&ip, cancel).await?;
        info!("Removed {}", ip);
        Ok(())
    }

    /// Snapshot of all entries, oldest admission first.
    pub fn list(&self) -> Vec<IpEntry> {
        self.entries().clone()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Evict every entry whose `updated_at` is strictly older than `now - ttl`.
    ///
    /// Entries are removed oldest-refresh first through the same path as
    /// [`Registry::delete_ip`]. The pass stops at the first failing command;
    /// entries removed before that are reported in the error and stay removed.
    pub async fn delete_out_of_date(
        &self,
        ttl: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<IpEntry>, PartialEviction> {
        let _mutation = self
            .lock_mutation(cancel)
            .await
            .map_err(|source| PartialEviction {
                removed: Vec::new(),
                source,
            })?;
        let now = self.clock.now();

        // A ttl reaching before the representable range makes nothing stale.
        let Some(cutoff) = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_sub_signed(ttl))
        else {
            return Ok(Vec::new());
        };

        let mut stale: Vec<(String, DateTime<Utc>)> = self
            .entries()
            .iter()
            .filter(|e| e.updated_at < cutoff)
            .map(|e| (e.ip.clone(), e.updated_at))
            .collect();
        stale.sort_by_key(|(_, updated_at)| *updated_at);

        let mut removed = Vec::with_capacity(stale.len());
        for (ip, _) in stale {
            match self.remove_locked(&ip, cancel).await {
                Ok(entry) => {
                    info!("Evicted {} (last refresh {})", entry.ip, entry.updated_at);
                    removed.push(entry);
                }
                Err(source) => return Err(PartialEviction { removed, source }),
            }
        }

        Ok(removed)
    }

    /// Remove an entry and run the remove command. Caller holds `mutation`.
    async fn remove_locked(
        &self,
        ip: &str,
        cancel: &CancellationToken,
    ) -> Result<IpEntry, AllowlistError> {
        let (index, entry) = {
            let mut entries = self.entries();
            let index = entries
                .iter()
                .position(|e| e.ip == ip)
                .ok_or_else(|| AllowlistError::NotFound(ip.to_string()))?;
            (index, entries.remove(index))
        };

        let rollback = Rollback::new(self, Undo::Reinstate(index, entry.clone()));
        self.run_rule(RuleAction::Remove, ip, cancel).await?;
        rollback.disarm();

        Ok(entry)
    }

    /// Wait for the mutation lock unless `cancel` fires first.
    async fn lock_mutation(
        &self,
        cancel: &CancellationToken,
    ) -> Result<MutationGuard<'_, ()>, AllowlistError> {
        tokio::select! {
            biased;
            guard = self.mutation.lock() => Ok(guard),
            _ = cancel.cancelled() => Err(AllowlistError::Cancelled),
        }
    }

    async fn run_rule(
        &self,
        action: RuleAction,
        ip: &str,
        cancel: &CancellationToken,
    ) -> Result<(), AllowlistError> {
        let invocation = self.rules.invocation(action, ip);
        debug!("Executing: {}", invocation);

        let failed = |source| AllowlistError::CommandExecutionFailed {
            ip: ip.to_string(),
            source,
        };

        let output = self
            .executor
            .execute(&invocation.program, &invocation.args, cancel)
            .await
            .map_err(failed)?;

        let text = output.combined();
        if !output.success {
            return Err(failed(CommandError::Failed {
                code: output.code,
                output: text.trim_end().to_string(),
            }));
        }
        if !text.trim().is_empty() {
            info!("{} {}: {}", action, ip, text.trim_end());
        }
        Ok(())
    }

    fn entries(&self) -> MutexGuard<'_, Vec<IpEntry>> {
        // Entries are only mutated in single statements, so a poisoned
        // vector is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

enum Undo {
    /// Drop an entry whose allow command did not complete
    Forget(String),
    /// Put a removed entry back at its old position
    Reinstate(usize, IpEntry),
}

/// Compensates a registry change on drop unless disarmed.
///
/// Armed across the firewall command, so an error return and a dropped
/// future both restore the previous state.
struct Rollback<'a> {
    registry: &'a Registry,
    undo: Option<Undo>,
}

impl<'a> Rollback<'a> {
    fn new(registry: &'a Registry, undo: Undo) -> Self {
        Self {
            registry,
            undo: Some(undo),
        }
    }

    fn disarm(mut self) {
        self.undo = None;
    }
}

impl Drop for Rollback<'_> {
    fn drop(&mut self) {
        match self.undo.take() {
            Some(Undo::Forget(ip)) => {
                self.registry.entries().retain(|entry| entry.ip != ip);
                warn!("Rolled back {} after failed or interrupted allow command", ip);
            }
            Some(Undo::Reinstate(index, entry)) => {
                let mut entries = self.registry.entries();
                let index = index.min(entries.len());
                warn!("Reinstated {} after failed or interrupted remove command", entry.ip);
                entries.insert(index, entry);
            }
            None => {}
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &*self.entries())
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}
