//! Timer-driven rescore loop with a global active-job budget.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hnrank_core::RankingSnapshot;
use hnrank_scoring::DynScoreProvider;
use hnrank_store::RankingStore;
use metrics::{counter, gauge, histogram};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::config::{SchedulerConfig, SchedulerConfigUpdate, SchedulerError, MAX_INTERVAL};
use crate::report::{CycleReport, CycleTrigger, JobOutcome, SchedulerStatus};
use crate::selection::{needs_scoring, select_candidates};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    store: Arc<RankingStore>,
    provider: DynScoreProvider,
    config: Mutex<SchedulerConfig>,
    /// ranking id -> job id for every job in flight.
    active: Mutex<HashMap<Uuid, String>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    next_run_at: Mutex<Option<DateTime<Utc>>>,
    last_cycle: Mutex<Option<CycleReport>>,
}

impl Shared {
    fn config(&self) -> SchedulerConfig {
        *lock(&self.config)
    }
}

/// Holds one active-job slot; the slot is released when this is dropped,
/// whichever way the job ends.
struct JobSlot {
    shared: Arc<Shared>,
    ranking_id: Uuid,
    job_id: String,
}

impl Drop for JobSlot {
    fn drop(&mut self) {
        let mut active = lock(&self.shared.active);
        if active.get(&self.ranking_id) == Some(&self.job_id) {
            active.remove(&self.ranking_id);
        }
        #[allow(clippy::cast_precision_loss)]
        gauge!("rescore_active_jobs").set(active.len() as f64);
    }
}

/// Periodically rescores ranking snapshots whose insight is missing, failed,
/// or stale.
///
/// Cloning is cheap; all clones drive the same scheduler. [`start`] and
/// [`update_config`] spawn Tokio tasks and must be called inside a runtime.
///
/// [`start`]: RescoreScheduler::start
/// [`update_config`]: RescoreScheduler::update_config
#[derive(Clone)]
pub struct RescoreScheduler {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for RescoreScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RescoreScheduler")
            .field("provider", &self.shared.provider.name())
            .field("config", &self.shared.config())
            .finish_non_exhaustive()
    }
}

impl RescoreScheduler {
    /// Creates a stopped scheduler. Zero values in `config` fall back to defaults.
    #[must_use]
    pub fn new(
        store: Arc<RankingStore>,
        provider: DynScoreProvider,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                provider,
                config: Mutex::new(config.sanitized()),
                active: Mutex::new(HashMap::new()),
                timer: Mutex::new(None),
                next_run_at: Mutex::new(None),
                last_cycle: Mutex::new(None),
            }),
        }
    }

    /// Arms the recurring timer. `interval` overrides the configured interval
    /// when given, non-zero, and no longer than [`MAX_INTERVAL`].
    ///
    /// Returns `false` without side effects if already running.
    pub fn start(&self, interval: Option<Duration>) -> bool {
        let mut timer = lock(&self.shared.timer);
        if timer.is_some() {
            tracing::info!("scheduler: start requested but already running");
            return false;
        }

        let config = {
            let mut config = lock(&self.shared.config);
            match interval {
                Some(i) if i.is_zero() => tracing::warn!("scheduler: ignoring zero start interval"),
                Some(i) if i > MAX_INTERVAL => tracing::warn!(
                    interval_secs = i.as_secs(),
                    max_interval_secs = MAX_INTERVAL.as_secs(),
                    "scheduler: ignoring start interval above maximum"
                ),
                Some(i) => config.interval = i,
                None => {}
            }
            *config
        };

        *timer = Some(spawn_timer(
            Arc::clone(&self.shared),
            config.interval,
            config.run_on_start,
        ));
        drop(timer);

        tracing::info!(
            interval_secs = config.interval.as_secs(),
            max_concurrent_jobs = config.max_concurrent_jobs,
            stale_after_secs = config.stale_after.as_secs(),
            run_on_start = config.run_on_start,
            provider = self.shared.provider.name(),
            "scheduler: started"
        );
        true
    }

    /// Stops the timer. In-flight jobs run to completion and release their
    /// slots. Returns `false` if already stopped.
    pub fn stop(&self) -> bool {
        let Some(handle) = lock(&self.shared.timer).take() else {
            tracing::debug!("scheduler: stop requested but already stopped");
            return false;
        };
        handle.abort();
        *lock(&self.shared.next_run_at) = None;
        tracing::info!(
            active_jobs = lock(&self.shared.active).len(),
            "scheduler: stopped"
        );
        true
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.shared.timer).is_some()
    }

    /// Runs one cycle now and waits for all of its jobs to settle.
    ///
    /// Shares the active-job budget with timer cycles; when the budget is
    /// full the cycle does nothing and reports `saturated`.
    pub async fn run_now(&self) -> CycleReport {
        run_cycle(Arc::clone(&self.shared), CycleTrigger::Manual).await
    }

    /// Alias for [`RescoreScheduler::run_now`].
    pub async fn force_cycle(&self) -> CycleReport {
        self.run_now().await
    }

    #[must_use]
    pub fn status(&self) -> SchedulerStatus {
        let config = self.shared.config();
        let mut active_job_ids: Vec<String> = lock(&self.shared.active).values().cloned().collect();
        active_job_ids.sort();
        let running = self.is_running();

        SchedulerStatus {
            running,
            interval_secs: config.interval.as_secs(),
            max_concurrent_jobs: config.max_concurrent_jobs,
            stale_after_secs: config.stale_after.as_secs(),
            active_jobs: active_job_ids.len(),
            active_job_ids,
            next_run_at: if running {
                *lock(&self.shared.next_run_at)
            } else {
                None
            },
            last_cycle: lock(&self.shared.last_cycle).clone(),
        }
    }

    /// Applies a partial config update.
    ///
    /// A changed interval re-arms a running timer; the next timer cycle is
    /// one new interval from now. In-flight jobs are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if any given value is zero.
    /// Nothing is applied in that case.
    pub fn update_config(
        &self,
        update: SchedulerConfigUpdate,
    ) -> Result<SchedulerStatus, SchedulerError> {
        update.validate()?;

        let (before, after) = {
            let mut config = lock(&self.shared.config);
            let before = *config;
            update.apply_to(&mut config);
            (before, *config)
        };

        if before.interval != after.interval {
            let mut timer = lock(&self.shared.timer);
            if let Some(handle) = timer.take() {
                handle.abort();
                *timer = Some(spawn_timer(Arc::clone(&self.shared), after.interval, false));
                tracing::info!(
                    interval_secs = after.interval.as_secs(),
                    "scheduler: timer re-armed with new interval"
                );
            }
        }

        tracing::info!(
            interval_secs = after.interval.as_secs(),
            max_concurrent_jobs = after.max_concurrent_jobs,
            stale_after_secs = after.stale_after.as_secs(),
            "scheduler: config updated"
        );
        Ok(self.status())
    }
}

fn spawn_timer(shared: Arc<Shared>, period: Duration, immediate: bool) -> JoinHandle<()> {
    let first = if immediate { Duration::ZERO } else { period };
    *lock(&shared.next_run_at) = Some(Utc::now() + chrono_duration(first));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            *lock(&shared.next_run_at) = Some(Utc::now() + chrono_duration(period));

            // Each cycle is its own task so a panicking cycle cannot end the timer.
            let cycle_shared = Arc::clone(&shared);
            tokio::spawn(async move {
                run_cycle(cycle_shared, CycleTrigger::Timer).await;
            });
        }
    })
}

fn chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d.min(MAX_INTERVAL)).unwrap_or_else(|_| chrono::Duration::zero())
}

async fn run_cycle(shared: Arc<Shared>, trigger: CycleTrigger) -> CycleReport {
    let mut report = CycleReport::begin(trigger);
    let config = shared.config();
    counter!("rescore_cycles_total", "trigger" => trigger.as_str()).increment(1);

    // Selection and registration happen under one lock so two overlapping
    // cycles can never exceed the budget or pick the same ranking.
    let jobs: Vec<(Arc<RankingSnapshot>, JobSlot)> = {
        let mut active = lock(&shared.active);
        let free = config.max_concurrent_jobs.saturating_sub(active.len());
        if free == 0 {
            report.saturated = true;
            Vec::new()
        } else {
            let candidates =
                select_candidates(&shared.store, &active, config.stale_after, Utc::now(), free);
            let jobs = candidates
                .into_iter()
                .map(|snapshot| {
                    let job_id = format!("{}:{}", report.cycle_id, snapshot.id);
                    active.insert(snapshot.id, job_id.clone());
                    let slot = JobSlot {
                        shared: Arc::clone(&shared),
                        ranking_id: snapshot.id,
                        job_id,
                    };
                    (snapshot, slot)
                })
                .collect::<Vec<_>>();
            #[allow(clippy::cast_precision_loss)]
            gauge!("rescore_active_jobs").set(active.len() as f64);
            jobs
        }
    };

    if report.saturated {
        counter!("rescore_cycles_saturated_total").increment(1);
        tracing::info!(
            cycle_id = %report.cycle_id,
            trigger = %trigger,
            max_concurrent_jobs = config.max_concurrent_jobs,
            "scheduler: active-job budget saturated; cycle skipped"
        );
        return finish(&shared, report);
    }

    report.selected = jobs.len();
    if jobs.is_empty() {
        tracing::debug!(cycle_id = %report.cycle_id, trigger = %trigger, "scheduler: nothing to rescore");
        return finish(&shared, report);
    }

    tracing::info!(
        cycle_id = %report.cycle_id,
        trigger = %trigger,
        selected = report.selected,
        "scheduler: starting rescore cycle"
    );

    let mut set = JoinSet::new();
    for (snapshot, slot) in jobs {
        set.spawn(run_job(Arc::clone(&shared), snapshot, slot, config.stale_after));
    }

    while let Some(joined) = set.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    cycle_id = %report.cycle_id,
                    error = %e,
                    "scheduler: rescore job panicked"
                );
                JobOutcome::Failed
            }
        };
        counter!("rescore_jobs_total", "outcome" => outcome.as_str()).increment(1);
        report.record(outcome);
    }

    tracing::info!(
        cycle_id = %report.cycle_id,
        trigger = %trigger,
        selected = report.selected,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "scheduler: rescore cycle complete"
    );
    finish(&shared, report)
}

fn finish(shared: &Shared, mut report: CycleReport) -> CycleReport {
    report.finished_at = Utc::now();
    #[allow(clippy::cast_precision_loss)]
    let elapsed_ms = (report.finished_at - report.started_at).num_milliseconds().max(0) as f64;
    histogram!("rescore_cycle_duration_ms").record(elapsed_ms);
    *lock(&shared.last_cycle) = Some(report.clone());
    report
}

async fn run_job(
    shared: Arc<Shared>,
    snapshot: Arc<RankingSnapshot>,
    slot: JobSlot,
    stale_after: Duration,
) -> JobOutcome {
    let ranking_id = snapshot.id;
    let job_id = slot.job_id.as_str();

    if !shared.provider.is_available() {
        tracing::info!(
            ranking_id = %ranking_id,
            job_id,
            provider = shared.provider.name(),
            "scheduler: score provider unavailable; job skipped"
        );
        return JobOutcome::Skipped;
    }

    if shared.store.get(ranking_id).is_none() {
        tracing::info!(ranking_id = %ranking_id, job_id, "scheduler: ranking evicted before scoring; job skipped");
        return JobOutcome::Skipped;
    }

    if !needs_scoring(shared.store.insight(ranking_id).as_ref(), stale_after, Utc::now()) {
        tracing::debug!(ranking_id = %ranking_id, job_id, "scheduler: insight already fresh; job skipped");
        return JobOutcome::Skipped;
    }

    match shared.provider.request_scoring(&snapshot).await {
        Ok(insight) => {
            let request_id = insight.request_id;
            if shared.store.save_insight(ranking_id, insight).is_some() {
                tracing::info!(
                    ranking_id = %ranking_id,
                    job_id,
                    request_id = %request_id,
                    "scheduler: insight refreshed"
                );
                JobOutcome::Succeeded
            } else {
                tracing::info!(
                    ranking_id = %ranking_id,
                    job_id,
                    "scheduler: ranking evicted during scoring; insight discarded"
                );
                JobOutcome::Skipped
            }
        }
        Err(e) => {
            tracing::error!(
                ranking_id = %ranking_id,
                job_id,
                provider = shared.provider.name(),
                error = %e,
                "scheduler: scoring failed"
            );
            JobOutcome::Failed
        }
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
