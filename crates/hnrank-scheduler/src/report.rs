use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleTrigger {
    Timer,
    Manual,
}

impl CycleTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timer => "timer",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for CycleTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single scoring job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    Skipped,
}

impl JobOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Summary of one settled cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub trigger: CycleTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The active-job budget was full; nothing was selected.
    pub saturated: bool,
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl CycleReport {
    pub(crate) fn begin(trigger: CycleTrigger) -> Self {
        let now = Utc::now();
        Self {
            cycle_id: Uuid::new_v4(),
            trigger,
            started_at: now,
            finished_at: now,
            saturated: false,
            selected: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
        }
    }

    pub(crate) fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Succeeded => self.succeeded += 1,
            JobOutcome::Failed => self.failed += 1,
            JobOutcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_secs: u64,
    pub max_concurrent_jobs: usize,
    pub stale_after_secs: u64,
    pub active_jobs: usize,
    pub active_job_ids: Vec<String>,
    /// Estimated time of the next timer-driven cycle; `None` when stopped.
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_cycle: Option<CycleReport>,
}
