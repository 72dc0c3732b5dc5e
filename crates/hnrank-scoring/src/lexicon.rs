//! Local lexicon scorer for Hacker News titles.
//!
//! Each article gets a blend of a title lexicon score and a recency score
//! derived from its relative age text. No network access is needed, so this
//! provider is always available.

use async_trait::async_trait;
use hnrank_core::{check_sort_order, parse_age_minutes, ArticleRecord, Insight, RankingSnapshot};
use serde::Serialize;

use crate::error::ScoringError;
use crate::provider::ScoreProvider;

/// Title word weights.
///
/// Keys are lowercase words. Values in `(0.0, 1.0]` are positive, in
/// `[-1.0, 0.0)` are negative. The title score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("show", 0.3),
    ("launch", 0.4),
    ("launched", 0.4),
    ("released", 0.4),
    ("release", 0.3),
    ("open-source", 0.4),
    ("opensource", 0.4),
    ("introducing", 0.3),
    ("faster", 0.3),
    ("fast", 0.2),
    ("improved", 0.3),
    ("new", 0.2),
    ("rust", 0.2),
    ("free", 0.2),
    ("simple", 0.2),
    ("breakthrough", 0.5),
    ("funded", 0.3),
    ("tutorial", 0.2),
    ("guide", 0.2),
    ("celebrating", 0.4),
    // Negative signals
    ("outage", -0.5),
    ("breach", -0.6),
    ("leak", -0.5),
    ("leaked", -0.5),
    ("vulnerability", -0.5),
    ("exploit", -0.5),
    ("layoffs", -0.6),
    ("lawsuit", -0.5),
    ("shutdown", -0.6),
    ("shutting", -0.5),
    ("deprecated", -0.3),
    ("broken", -0.4),
    ("bug", -0.3),
    ("slow", -0.3),
    ("dead", -0.4),
    ("banned", -0.5),
    ("fined", -0.4),
    ("failure", -0.4),
    ("failed", -0.4),
    ("scam", -0.6),
];

const TITLE_WEIGHT: f32 = 0.6;
const RECENCY_WEIGHT: f32 = 0.4;
const TOP_POSITIONS: usize = 5;

/// Score a title using the lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps
/// the result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == w) {
            score += weight;
        }
    }
    score.clamp(-1.0, 1.0)
}

/// `1.0` for "just now", decaying towards `0.0` as the article ages.
/// Unparseable ages score `0.0`.
#[allow(clippy::cast_precision_loss)]
fn recency_score(time_text: &str) -> f32 {
    match parse_age_minutes(time_text) {
        Some(minutes) => 1.0 / (1.0 + minutes as f32 / 60.0),
        None => 0.0,
    }
}

#[derive(Debug, Serialize)]
struct ArticleScore<'a> {
    position: u32,
    title: &'a str,
    score: f32,
    age_minutes: Option<u64>,
}

fn score_article(article: &ArticleRecord) -> ArticleScore<'_> {
    let title = lexicon_score(&article.title);
    let recency = recency_score(&article.time_text);
    ArticleScore {
        position: article.position,
        title: &article.title,
        score: TITLE_WEIGHT * title + RECENCY_WEIGHT * recency,
        age_minutes: parse_age_minutes(&article.time_text),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconProvider;

impl LexiconProvider {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Builds the insight payload for a snapshot. Pure and synchronous.
    #[must_use]
    pub fn score_snapshot(snapshot: &RankingSnapshot) -> serde_json::Value {
        let sort_check = check_sort_order(&snapshot.articles);
        let sort_verdict_agrees = sort_check.is_sorted == snapshot.is_correctly_sorted;

        if snapshot.articles.is_empty() {
            return serde_json::json!({
                "method": "lexicon",
                "article_count": 0,
                "average_score": 0.0,
                "article_scores": [],
                "top_positions": [],
                "sort_check": sort_check,
                "sort_verdict_agrees": sort_verdict_agrees,
                "analysis": "No articles to score.",
            });
        }

        let scores: Vec<ArticleScore<'_>> = snapshot.articles.iter().map(score_article).collect();
        #[allow(clippy::cast_precision_loss)]
        let average = scores.iter().map(|s| s.score).sum::<f32>() / scores.len() as f32;

        let mut ranked: Vec<&ArticleScore<'_>> = scores.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        let top_positions: Vec<u32> = ranked
            .iter()
            .take(TOP_POSITIONS)
            .map(|s| s.position)
            .collect();

        let analysis = format!(
            "Scored {} articles; mean score {average:.3}; {} sort violation(s); {} unparsed age(s).",
            scores.len(),
            sort_check.violations.len(),
            sort_check.unparsed,
        );

        serde_json::json!({
            "method": "lexicon",
            "article_count": scores.len(),
            "average_score": average,
            "article_scores": scores,
            "top_positions": top_positions,
            "sort_check": sort_check,
            "sort_verdict_agrees": sort_verdict_agrees,
            "analysis": analysis,
        })
    }
}

#[async_trait]
impl ScoreProvider for LexiconProvider {
    fn name(&self) -> &'static str {
        "lexicon"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn request_scoring(&self, snapshot: &RankingSnapshot) -> Result<Insight, ScoringError> {
        let payload = Self::score_snapshot(snapshot);
        Ok(Insight::new(snapshot.id, self.name(), true, payload))
    }
}
