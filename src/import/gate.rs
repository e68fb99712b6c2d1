//! Minimum interval between imports
//!
//! AniDB bans clients that download the dump more than once a day, so an
//! import only proceeds when the previous one is old enough.

use crate::types::ImportMetadata;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Default minimum interval between two imports
pub const DEFAULT_IMPORT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// The previous import is too recent
#[derive(Debug, Clone, Error)]
#[error("last import at {last_import}, less than {interval:?} ago")]
pub struct IntervalError {
    pub last_import: DateTime<Utc>,
    pub interval: Duration,
}

/// Decides whether an import may run, based on the stored metadata
#[derive(Debug, Clone, Copy)]
pub struct IntervalGate {
    interval: Duration,
}

impl Default for IntervalGate {
    fn default() -> Self {
        Self::new(DEFAULT_IMPORT_INTERVAL)
    }
}

impl IntervalGate {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check against the current time
    pub fn check(&self, previous: Option<&ImportMetadata>) -> Result<(), IntervalError> {
        self.check_at(previous, Utc::now())
    }

    /// Check against a given time
    ///
    /// No previous import always passes. Exactly `interval` since the previous
    /// import passes.
    pub fn check_at(
        &self,
        previous: Option<&ImportMetadata>,
        now: DateTime<Utc>,
    ) -> Result<(), IntervalError> {
        let Some(previous) = previous else {
            return Ok(());
        };

        // An interval too large for chrono can never have elapsed
        let too_recent = match chrono::Duration::from_std(self.interval) {
            Ok(interval) => now.signed_duration_since(previous.retrieved_at) < interval,
            Err(_) => true,
        };

        if too_recent {
            Err(IntervalError {
                last_import: previous.retrieved_at,
                interval: self.interval,
            })
        } else {
            Ok(())
        }
    }
}
