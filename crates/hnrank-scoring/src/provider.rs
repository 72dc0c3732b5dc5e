use std::sync::Arc;

use async_trait::async_trait;
use hnrank_core::{Insight, RankingSnapshot};

use crate::error::ScoringError;

/// A backend that can score a ranking snapshot.
///
/// `is_available` must be cheap and side-effect free; the scheduler calls it
/// before every job. `request_scoring` must not touch the ranking store, it
/// only reads the snapshot it is given and returns an insight.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    /// Short identifier recorded on every insight, e.g. `"lexicon"`.
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    async fn request_scoring(&self, snapshot: &RankingSnapshot) -> Result<Insight, ScoringError>;
}

pub type DynScoreProvider = Arc<dyn ScoreProvider>;

/// Provider used when scoring is switched off. Never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledProvider;

#[async_trait]
impl ScoreProvider for DisabledProvider {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn request_scoring(&self, _snapshot: &RankingSnapshot) -> Result<Insight, ScoringError> {
        Err(ScoringError::Unavailable(
            "score provider is disabled".to_string(),
        ))
    }
}
