use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 3;
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(2 * 60 * 60);
/// Upper bound on the timer interval. Larger values cannot be scheduled.
pub const MAX_INTERVAL: Duration = Duration::from_secs(hnrank_core::MAX_RESCORE_INTERVAL_SECS);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("invalid scheduler config: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between timer-driven cycles.
    pub interval: Duration,
    /// Upper bound on scoring jobs in flight across all cycles.
    pub max_concurrent_jobs: usize,
    /// Insights older than this are rescored.
    pub stale_after: Duration,
    /// Fire a cycle as soon as the timer is armed.
    pub run_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            stale_after: DEFAULT_STALE_AFTER,
            run_on_start: true,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn from_app_config(config: &hnrank_core::AppConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.rescore_interval_secs),
            max_concurrent_jobs: config.rescore_max_concurrent_jobs,
            stale_after: Duration::from_secs(config.insight_stale_after_secs),
            run_on_start: config.rescore_run_on_start,
        }
    }

    /// Replaces zero values with their defaults and caps the interval at
    /// [`MAX_INTERVAL`].
    pub(crate) fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            interval: if self.interval.is_zero() {
                defaults.interval
            } else {
                self.interval.min(MAX_INTERVAL)
            },
            max_concurrent_jobs: if self.max_concurrent_jobs == 0 {
                defaults.max_concurrent_jobs
            } else {
                self.max_concurrent_jobs
            },
            stale_after: if self.stale_after.is_zero() {
                defaults.stale_after
            } else {
                self.stale_after
            },
            run_on_start: self.run_on_start,
        }
    }
}

/// Partial runtime update. Absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfigUpdate {
    pub interval_secs: Option<u64>,
    pub max_concurrent_jobs: Option<usize>,
    pub stale_after_secs: Option<u64>,
}

impl SchedulerConfigUpdate {
    /// Rejects zero values and intervals above [`MAX_INTERVAL`].
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        fn positive(field: &'static str, value: Option<u64>) -> Result<(), SchedulerError> {
            match value {
                Some(0) => Err(SchedulerError::InvalidConfig {
                    field,
                    reason: "must be greater than zero".to_string(),
                }),
                _ => Ok(()),
            }
        }

        positive("interval_secs", self.interval_secs)?;
        if self
            .interval_secs
            .is_some_and(|secs| secs > MAX_INTERVAL.as_secs())
        {
            return Err(SchedulerError::InvalidConfig {
                field: "interval_secs",
                reason: format!("must be at most {}", MAX_INTERVAL.as_secs()),
            });
        }
        positive(
            "max_concurrent_jobs",
            self.max_concurrent_jobs.map(|n| n as u64),
        )?;
        positive("stale_after_secs", self.stale_after_secs)?;
        Ok(())
    }

    pub(crate) fn apply_to(&self, config: &mut SchedulerConfig) {
        if let Some(secs) = self.interval_secs {
            config.interval = Duration::from_secs(secs);
        }
        if let Some(jobs) = self.max_concurrent_jobs {
            config.max_concurrent_jobs = jobs;
        }
        if let Some(secs) = self.stale_after_secs {
            config.stale_after = Duration::from_secs(secs);
        }
    }
}
