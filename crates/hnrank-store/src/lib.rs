//! Bounded in-memory registry of ranking snapshots, their insights, and
//! reader feedback.
//!
//! [`RankingStore`] is the only owner of this state. Snapshots are handed out
//! as `Arc<RankingSnapshot>` and never mutated, so a background job holding an
//! old reference cannot corrupt newer state; it can only find that its id has
//! since been evicted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use hnrank_core::{FeedbackEntry, Insight, NewFeedback, NewRanking, RankingSnapshot};
use serde::Serialize;
use uuid::Uuid;

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Point-in-time counts for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub snapshots: usize,
    pub insights: usize,
    pub feedback: usize,
    pub capacity: usize,
}

#[derive(Debug, Default)]
struct Inner {
    /// Oldest first; the back is the current snapshot.
    history: VecDeque<Arc<RankingSnapshot>>,
    insights: HashMap<Uuid, Insight>,
    /// Oldest first.
    feedback: Vec<FeedbackEntry>,
}

impl Inner {
    fn contains(&self, id: Uuid) -> bool {
        self.history.iter().any(|s| s.id == id)
    }
}

#[derive(Debug)]
pub struct RankingStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl Default for RankingStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl RankingStore {
    /// Creates an empty store holding at most `capacity` snapshots (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                history: VecDeque::with_capacity(capacity + 1),
                ..Inner::default()
            }),
            capacity,
        }
    }

    // Lock poisoning is recovered, not propagated.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().history.is_empty()
    }

    /// Stores a new snapshot, makes it current, and evicts the oldest
    /// snapshots beyond capacity together with their insights and feedback.
    pub fn create_snapshot(&self, new: NewRanking) -> Arc<RankingSnapshot> {
        let snapshot = Arc::new(RankingSnapshot::from_new(new));
        let mut inner = self.lock();
        inner.history.push_back(Arc::clone(&snapshot));

        while inner.history.len() > self.capacity {
            let Some(evicted) = inner.history.pop_front() else {
                break;
            };
            let had_insight = inner.insights.remove(&evicted.id).is_some();
            let before = inner.feedback.len();
            inner.feedback.retain(|f| f.ranking_id != evicted.id);
            tracing::debug!(
                ranking_id = %evicted.id,
                had_insight,
                feedback_removed = before - inner.feedback.len(),
                "store: evicted oldest ranking snapshot"
            );
        }
        drop(inner);

        tracing::info!(
            ranking_id = %snapshot.id,
            articles = snapshot.articles.len(),
            sorted = snapshot.is_correctly_sorted,
            "store: ranking snapshot created"
        );
        snapshot
    }

    /// The most recently created snapshot still in history.
    #[must_use]
    pub fn current(&self) -> Option<Arc<RankingSnapshot>> {
        self.lock().history.back().cloned()
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Arc<RankingSnapshot>> {
        self.lock().history.iter().find(|s| s.id == id).cloned()
    }

    /// All live snapshots, newest first.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<RankingSnapshot>> {
        self.lock().history.iter().rev().cloned().collect()
    }

    /// Stores or replaces the insight for `ranking_id`.
    ///
    /// Returns `None` without storing anything if the ranking is no longer in
    /// history. The saved insight always carries `ranking_id` and a fresh
    /// `recorded_at`.
    pub fn save_insight(&self, ranking_id: Uuid, mut insight: Insight) -> Option<Insight> {
        let mut inner = self.lock();
        if !inner.contains(ranking_id) {
            drop(inner);
            tracing::info!(
                ranking_id = %ranking_id,
                request_id = %insight.request_id,
                "store: ranking no longer in history; insight dropped"
            );
            return None;
        }

        insight.ranking_id = ranking_id;
        insight.recorded_at = Some(Utc::now());
        inner.insights.insert(ranking_id, insight.clone());
        Some(insight)
    }

    #[must_use]
    pub fn insight(&self, ranking_id: Uuid) -> Option<Insight> {
        self.lock().insights.get(&ranking_id).cloned()
    }

    /// Appends a feedback entry. Business validation is the caller's job.
    pub fn add_feedback(&self, new: NewFeedback) -> FeedbackEntry {
        let entry = FeedbackEntry::from_new(new);
        self.lock().feedback.push(entry.clone());
        entry
    }

    /// Feedback entries newest first, optionally restricted to one ranking.
    #[must_use]
    pub fn list_feedback(&self, ranking_id: Option<Uuid>) -> Vec<FeedbackEntry> {
        self.lock()
            .feedback
            .iter()
            .rev()
            .filter(|f| ranking_id.is_none_or(|id| f.ranking_id == id))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let inner = self.lock();
        StoreStats {
            snapshots: inner.history.len(),
            insights: inner.insights.len(),
            feedback: inner.feedback.len(),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
