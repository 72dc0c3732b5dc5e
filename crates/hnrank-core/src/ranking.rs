//! Ranking snapshots, scoring insights, and reader feedback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One article as collected from the listing, in rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    /// Relative age exactly as shown on the page, e.g. `"3 hours ago"`.
    pub time_text: String,
    /// 1-based listing page the article was found on.
    pub page: u32,
    /// 1-based position within the full collected sequence.
    pub position: u32,
}

/// Fields supplied by the scrape collaborator when a run completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRanking {
    pub source_url: String,
    /// Defaults to `articles.len()` when absent.
    #[serde(default)]
    pub total_articles: Option<usize>,
    #[serde(default)]
    pub pages_navigated: u32,
    #[serde(default)]
    pub is_correctly_sorted: bool,
    #[serde(default)]
    pub articles: Vec<ArticleRecord>,
}

/// One completed scrape-and-validate run. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingSnapshot {
    pub id: Uuid,
    pub source_url: String,
    pub total_articles: usize,
    pub pages_navigated: u32,
    pub is_correctly_sorted: bool,
    pub articles: Vec<ArticleRecord>,
    pub generated_at: DateTime<Utc>,
}

impl RankingSnapshot {
    /// Builds a snapshot with a fresh id and timestamp.
    #[must_use]
    pub fn from_new(new: NewRanking) -> Self {
        let total_articles = new.total_articles.unwrap_or(new.articles.len());
        Self {
            id: Uuid::new_v4(),
            source_url: new.source_url,
            total_articles,
            pages_navigated: new.pages_navigated,
            is_correctly_sorted: new.is_correctly_sorted,
            articles: new.articles,
            generated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn has_articles(&self) -> bool {
        !self.articles.is_empty()
    }

    /// Returns `true` if `position` addresses an article of this snapshot.
    #[must_use]
    pub fn contains_position(&self, position: u32) -> bool {
        position >= 1 && usize::try_from(position).is_ok_and(|p| p <= self.articles.len())
    }
}

/// Latest scoring output attached to a ranking snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub ranking_id: Uuid,
    /// Identifies the provider call that produced this insight.
    pub request_id: Uuid,
    pub provider: String,
    pub success: bool,
    /// Provider-specific result (scores, analysis text).
    pub payload: serde_json::Value,
    pub generated_at: DateTime<Utc>,
    /// Stamped by the store when the insight is saved.
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl Insight {
    /// Creates an insight for `ranking_id` with a fresh request id, generated now.
    #[must_use]
    pub fn new(
        ranking_id: Uuid,
        provider: impl Into<String>,
        success: bool,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            ranking_id,
            request_id: Uuid::new_v4(),
            provider: provider.into(),
            success,
            payload,
            generated_at: Utc::now(),
            recorded_at: None,
        }
    }

    /// Age of this insight relative to `now`. Future timestamps count as zero.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.generated_at).max(chrono::Duration::zero())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Promote,
    Demote,
    Correct,
}

impl std::fmt::Display for Vote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vote::Promote => write!(f, "promote"),
            Vote::Demote => write!(f, "demote"),
            Vote::Correct => write!(f, "correct"),
        }
    }
}

impl std::str::FromStr for Vote {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "promote" => Ok(Vote::Promote),
            "demote" => Ok(Vote::Demote),
            "correct" => Ok(Vote::Correct),
            other => Err(format!(
                "invalid vote \"{other}\"; expected promote, demote or correct"
            )),
        }
    }
}

/// Feedback as submitted, already validated by the calling boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub ranking_id: Uuid,
    pub article_position: u32,
    pub vote: Vote,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: Uuid,
    pub ranking_id: Uuid,
    pub article_position: u32,
    pub vote: Vote,
    pub notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl FeedbackEntry {
    #[must_use]
    pub fn from_new(new: NewFeedback) -> Self {
        Self {
            id: Uuid::new_v4(),
            ranking_id: new.ranking_id,
            article_position: new.article_position,
            vote: new.vote,
            notes: new.notes,
            submitted_at: Utc::now(),
        }
    }
}
