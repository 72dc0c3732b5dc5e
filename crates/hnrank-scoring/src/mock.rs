//! Deterministic in-process provider for tests and local runs.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use hnrank_core::{Insight, RankingSnapshot};

use crate::error::ScoringError;
use crate::provider::ScoreProvider;

/// Scores after a fixed latency, fails for chosen source URLs, and records
/// how many calls it served and the peak number running at once.
#[derive(Debug)]
pub struct MockProvider {
    latency: Duration,
    available: AtomicBool,
    failing_sources: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            available: AtomicBool::new(true),
            failing_sources: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every snapshot whose `source_url` equals `source_url` fails to score.
    #[must_use]
    pub fn failing_for(self, source_url: impl Into<String>) -> Self {
        self.failing_sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source_url.into());
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn should_fail(&self, source_url: &str) -> bool {
        self.failing_sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(source_url)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScoreProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn request_scoring(&self, snapshot: &RankingSnapshot) -> Result<Insight, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.should_fail(&snapshot.source_url) {
            return Err(ScoringError::Provider(format!(
                "mock failure for {}",
                snapshot.source_url
            )));
        }

        let payload = serde_json::json!({
            "method": "mock",
            "article_count": snapshot.articles.len(),
            "source_url": snapshot.source_url,
        });
        Ok(Insight::new(snapshot.id, self.name(), true, payload))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hnrank_core::NewRanking;

    use super::*;

    fn snapshot(source_url: &str) -> RankingSnapshot {
        RankingSnapshot::from_new(NewRanking {
            source_url: source_url.to_string(),
            ..NewRanking::default()
        })
    }

    #[tokio::test]
    async fn scores_and_counts_calls() {
        let mock = MockProvider::new();
        let snap = snapshot("a");
        let insight = mock.request_scoring(&snap).await.unwrap();
        assert_eq!(insight.ranking_id, snap.id);
        assert_eq!(insight.payload["source_url"], "a");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn fails_for_configured_source() {
        let mock = MockProvider::new().failing_for("bad");
        assert!(mock.request_scoring(&snapshot("bad")).await.is_err());
        assert!(mock.request_scoring(&snapshot("good")).await.is_ok());
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn tracks_peak_concurrency() {
        let mock = Arc::new(MockProvider::new().with_latency(Duration::from_millis(50)));
        let mut handles = Vec::new();
        for i in 0..4 {
            let mock = Arc::clone(&mock);
            handles.push(tokio::spawn(async move {
                let snap = snapshot(&i.to_string());
                mock.request_scoring(&snap).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(mock.max_in_flight(), 4);
        assert_eq!(mock.in_flight.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn availability_can_be_toggled() {
        let mock = MockProvider::new();
        assert!(mock.is_available());
        mock.set_available(false);
        assert!(!mock.is_available());
    }
}
