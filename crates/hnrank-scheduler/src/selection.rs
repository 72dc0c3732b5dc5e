//! Which snapshots a cycle picks up.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hnrank_core::{Insight, RankingSnapshot};
use hnrank_store::RankingStore;
use uuid::Uuid;

/// A ranking needs scoring when it has no insight, its insight failed, or
/// its insight is older than `stale_after`.
#[must_use]
pub fn needs_scoring(insight: Option<&Insight>, stale_after: Duration, now: DateTime<Utc>) -> bool {
    match insight {
        None => true,
        Some(insight) if !insight.success => true,
        Some(insight) => insight
            .age(now)
            .to_std()
            .is_ok_and(|age| age > stale_after),
    }
}

/// Up to `limit` snapshots in store order (newest first) that have articles,
/// have no job in `active`, and need scoring.
pub(crate) fn select_candidates(
    store: &RankingStore,
    active: &HashMap<Uuid, String>,
    stale_after: Duration,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<Arc<RankingSnapshot>> {
    store
        .list()
        .into_iter()
        .filter(|snapshot| snapshot.has_articles())
        .filter(|snapshot| !active.contains_key(&snapshot.id))
        .filter(|snapshot| needs_scoring(store.insight(snapshot.id).as_ref(), stale_after, now))
        .take(limit)
        .collect()
}
