//! Background rescoring of ranking snapshots.
//!
//! [`RescoreScheduler`] wakes on a fixed interval (or on demand), picks the
//! snapshots whose insight is missing, failed, or stale, and scores them
//! through a [`hnrank_scoring::ScoreProvider`] with a global cap on jobs in
//! flight. Failures are logged and counted; the next cycle picks the same
//! snapshots up again.

mod config;
mod report;
mod scheduler;
mod selection;

pub use config::{
    SchedulerConfig, SchedulerConfigUpdate, SchedulerError, DEFAULT_INTERVAL,
    DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_STALE_AFTER, MAX_INTERVAL,
};
pub use report::{CycleReport, CycleTrigger, JobOutcome, SchedulerStatus};
pub use scheduler::RescoreScheduler;
pub use selection::needs_scoring;

/// Registers descriptions for the scheduler's metrics with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "rescore_cycles_total",
        "Rescore cycles started, labelled by trigger."
    );
    metrics::describe_counter!(
        "rescore_cycles_saturated_total",
        "Rescore cycles skipped because the active-job budget was full."
    );
    metrics::describe_counter!(
        "rescore_jobs_total",
        "Rescore jobs settled, labelled by outcome."
    );
    metrics::describe_gauge!("rescore_active_jobs", "Rescore jobs currently in flight.");
    metrics::describe_histogram!(
        "rescore_cycle_duration_ms",
        "Wall time of a rescore cycle in milliseconds."
    );
}
