//! Relative-age parsing and newest-first sort validation.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::ranking::ArticleRecord;

static AGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(second|minute|hour|day|month|year)s?\s+ago$").expect("valid regex")
});

/// Parse a listing age such as `"5 minutes ago"` into whole minutes.
///
/// Seconds round down to zero minutes; months count as 30 days and years as
/// 365 days. Returns `None` for text that is not a relative age.
#[must_use]
pub fn parse_age_minutes(time_text: &str) -> Option<u64> {
    let text = time_text.trim().to_ascii_lowercase();
    if text == "just now" {
        return Some(0);
    }

    let caps = AGE_RE.captures(&text)?;
    let amount: u64 = caps[1].parse().ok()?;
    let minutes_per_unit: u64 = match &caps[2] {
        "second" => return Some(amount / 60),
        "minute" => 1,
        "hour" => 60,
        "day" => 60 * 24,
        "month" => 60 * 24 * 30,
        "year" => 60 * 24 * 365,
        _ => return None,
    };
    amount.checked_mul(minutes_per_unit)
}

/// Result of checking that articles run newest to oldest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortCheck {
    pub is_sorted: bool,
    /// Positions whose age is smaller (newer) than the previous parsed article.
    pub violations: Vec<u32>,
    /// Number of articles whose age text could not be parsed.
    pub unparsed: usize,
}

/// Check that `articles` are ordered newest first (non-decreasing age).
///
/// Articles with unparseable ages are skipped and counted; they neither
/// satisfy nor violate the ordering.
#[must_use]
pub fn check_sort_order(articles: &[ArticleRecord]) -> SortCheck {
    let mut violations = Vec::new();
    let mut unparsed = 0usize;
    let mut previous: Option<u64> = None;

    for article in articles {
        let Some(age) = parse_age_minutes(&article.time_text) else {
            unparsed += 1;
            continue;
        };
        if previous.is_some_and(|prev| age < prev) {
            violations.push(article.position);
        }
        previous = Some(age);
    }

    SortCheck {
        is_sorted: violations.is_empty(),
        violations,
        unparsed,
    }
}
