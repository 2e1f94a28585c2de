//! Pluggable time source.
//!
//! The registry stamps entries and computes eviction cutoffs through a
//! [`Clock`], so tests (and the `clock: fixed` config mode) can pin time.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// Format accepted by [`parse_datetime`] and the `fixed_time` config key.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    /// Create a clock pinned to a `YYYY-MM-DD HH:MM:SS` UTC timestamp.
    pub fn at(value: &str) -> Result<Self> {
        Ok(Self::new(parse_datetime(value)?))
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.lock() = instant;
    }

    pub fn set_datetime(&self, value: &str) -> Result<()> {
        self.set(parse_datetime(value)?);
        Ok(())
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.lock();
        *guard = TimeDelta::from_std(by)
            .ok()
            .and_then(|delta| guard.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned guard still holds a valid timestamp.
        self.instant.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp as UTC.
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), DATETIME_FORMAT)
        .with_context(|| format!("Invalid datetime '{}', expected YYYY-MM-DD HH:MM:SS", value))?;
    Ok(naive.and_utc())
}
