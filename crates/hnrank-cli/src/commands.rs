//! Command handlers for the CLI.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use hnrank_core::{check_sort_order, AppConfig, NewRanking, ProviderKind, SortCheck};
use hnrank_scheduler::{RescoreScheduler, SchedulerConfig};
use hnrank_scoring::{build_provider, ProviderSettings};
use hnrank_store::RankingStore;
use serde::Serialize;

/// Output of `check`.
#[derive(Debug, Serialize)]
pub(crate) struct CheckReport {
    pub source_url: String,
    pub total_articles: usize,
    pub recorded_verdict: bool,
    pub check: SortCheck,
    pub agrees: bool,
}

/// Reads a ranking JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid ranking.
pub(crate) fn load_ranking(path: &Path) -> anyhow::Result<NewRanking> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid ranking JSON in {}", path.display()))
}

pub(crate) fn build_check_report(ranking: &NewRanking) -> CheckReport {
    let check = check_sort_order(&ranking.articles);
    CheckReport {
        source_url: ranking.source_url.clone(),
        total_articles: ranking.total_articles.unwrap_or(ranking.articles.len()),
        recorded_verdict: ranking.is_correctly_sorted,
        agrees: check.is_sorted == ranking.is_correctly_sorted,
        check,
    }
}

pub(crate) fn run_check(input: &Path) -> anyhow::Result<()> {
    let ranking = load_ranking(input)?;
    let report = build_check_report(&ranking);
    if !report.agrees {
        tracing::warn!(
            recorded = report.recorded_verdict,
            computed = report.check.is_sorted,
            "recorded sort verdict disagrees with computed order"
        );
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Stores the snapshot in a one-slot store and drives a single manual cycle
/// through the rescore scheduler.
///
/// # Errors
///
/// Returns an error if the input is unusable, the provider cannot be built,
/// or the cycle produces no insight.
pub(crate) async fn run_score(
    config: &AppConfig,
    input: &Path,
    provider_override: Option<ProviderKind>,
) -> anyhow::Result<()> {
    let ranking = load_ranking(input)?;
    if ranking.articles.is_empty() {
        anyhow::bail!("{} contains no articles; nothing to score", input.display());
    }

    let mut settings = ProviderSettings::from_app_config(config);
    if let Some(kind) = provider_override {
        settings.kind = kind;
    }
    let provider = build_provider(&settings)?;
    if !provider.is_available() {
        anyhow::bail!("score provider '{}' is not available", provider.name());
    }

    let store = Arc::new(RankingStore::new(1));
    let snapshot = store.create_snapshot(ranking);
    let scheduler = RescoreScheduler::new(
        Arc::clone(&store),
        provider,
        SchedulerConfig {
            run_on_start: false,
            ..SchedulerConfig::from_app_config(config)
        },
    );

    let report = scheduler.run_now().await;
    tracing::info!(
        cycle_id = %report.cycle_id,
        succeeded = report.succeeded,
        failed = report.failed,
        "score cycle settled"
    );

    let insight = store
        .insight(snapshot.id)
        .with_context(|| format!("scoring failed for {} (see log)", input.display()))?;
    println!("{}", serde_json::to_string_pretty(&insight)?);
    Ok(())
}
