//! Sleep interval between reconciliation cycles
//!
//! Production uses [`RandomInterval`] so that many updaters started at the
//! same moment drift apart instead of polling the IP service and the DNS
//! provider in lockstep. Tests inject [`FixedInterval`].

use crate::config::{MAX_INTERVAL_SECS, ScheduleConfig};
use crate::error::{Error, Result};
use rand::Rng;
use std::time::Duration;

/// Source of the delay before the next cycle
pub trait IntervalPolicy: Send + Sync {
    /// Duration to sleep before the next cycle
    ///
    /// Must be strictly positive and bounded.
    fn next_interval(&self) -> Duration;
}

/// Uniformly random interval within `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomInterval {
    min: Duration,
    max: Duration,
}

impl RandomInterval {
    /// Create a policy drawing from `[min, max]`
    ///
    /// # Errors
    ///
    /// `min` must be non-zero and not greater than `max`, and `max` must not
    /// exceed [`MAX_INTERVAL_SECS`].
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min.is_zero() {
            return Err(Error::invalid_input("minimum interval must be > 0"));
        }
        if min > max {
            return Err(Error::invalid_input(format!(
                "minimum interval {:?} exceeds maximum {:?}",
                min, max
            )));
        }
        if max > Duration::from_secs(MAX_INTERVAL_SECS) {
            return Err(Error::invalid_input(format!(
                "maximum interval {:?} exceeds {} seconds",
                max, MAX_INTERVAL_SECS
            )));
        }
        Ok(Self { min, max })
    }

    /// `period` plus or minus `jitter`, clamped to at least one second
    pub fn around(period: Duration, jitter: Duration) -> Result<Self> {
        let min = period.saturating_sub(jitter).max(Duration::from_secs(1));
        let max = period
            .checked_add(jitter)
            .ok_or_else(|| Error::invalid_input("interval period plus jitter overflows"))?;
        Self::new(min, max)
    }

    /// Build from the `[schedule]` table
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Self::new(config.min_interval(), config.max_interval())
    }

    /// Lower bound
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> Duration {
        self.max
    }
}

impl IntervalPolicy for RandomInterval {
    fn next_interval(&self) -> Duration {
        // Millisecond resolution is plenty for a multi-minute poll.
        // Both bounds fit in a u64 since max is capped at one day.
        let min_ms = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        let ms = rand::rng().random_range(min_ms..=max_ms.max(min_ms));
        Duration::from_millis(ms.max(1))
    }
}

/// Constant interval, for tests and debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedInterval(pub Duration);

impl IntervalPolicy for FixedInterval {
    fn next_interval(&self) -> Duration {
        self.0
    }
}
