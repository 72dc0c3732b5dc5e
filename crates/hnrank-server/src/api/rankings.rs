use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use hnrank_core::{Insight, NewRanking, RankingSnapshot};
use hnrank_scoring::{DynScoreProvider, ScoringError};
use hnrank_store::RankingStore;
use metrics::counter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{normalize_limit, parse_ranking_id, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct RankingListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct RankingSummary {
    id: Uuid,
    source_url: String,
    total_articles: usize,
    pages_navigated: u32,
    is_correctly_sorted: bool,
    generated_at: DateTime<Utc>,
    insight_generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(super) struct CreatedRanking {
    id: Uuid,
    total_articles: usize,
    generated_at: DateTime<Utc>,
    initial_scoring: &'static str,
}

fn not_found(req_id: &str, id: Uuid) -> ApiError {
    ApiError::new(req_id, "not_found", format!("ranking {id} not found"))
}

fn snapshot_or_404(
    store: &RankingStore,
    req_id: &str,
    raw_id: &str,
) -> Result<Arc<RankingSnapshot>, ApiError> {
    let id = parse_ranking_id(req_id, raw_id)?;
    store.get(id).ok_or_else(|| not_found(req_id, id))
}

/// Scores a freshly created ranking in the background. The outcome is only
/// visible in logs, metrics, and the insight endpoint.
fn spawn_initial_scoring(
    store: Arc<RankingStore>,
    provider: DynScoreProvider,
    snapshot: Arc<RankingSnapshot>,
) {
    tokio::spawn(async move {
        let ranking_id = snapshot.id;
        let outcome = match provider.request_scoring(&snapshot).await {
            Ok(insight) => {
                if store.save_insight(ranking_id, insight).is_some() {
                    tracing::info!(ranking_id = %ranking_id, "initial scoring saved");
                    "succeeded"
                } else {
                    "skipped"
                }
            }
            Err(e) => {
                tracing::error!(
                    ranking_id = %ranking_id,
                    provider = provider.name(),
                    error = %e,
                    "initial scoring failed"
                );
                "failed"
            }
        };
        counter!("initial_scoring_total", "outcome" => outcome).increment(1);
    });
}

/// POST /api/v1/rankings: record a completed scrape.
pub(super) async fn create_ranking(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<NewRanking>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedRanking>>), ApiError> {
    let rid = &req_id.0;

    if body.source_url.trim().is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "source_url must not be empty",
        ));
    }
    if let Some(bad) = body.articles.iter().find(|a| a.position == 0) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("article positions are 1-based, got 0 for '{}'", bad.title),
        ));
    }

    let snapshot = state.store.create_snapshot(body);

    let initial_scoring = if !snapshot.has_articles() {
        "skipped_empty"
    } else if !state.provider.is_available() {
        "skipped_unavailable"
    } else {
        spawn_initial_scoring(
            Arc::clone(&state.store),
            Arc::clone(&state.provider),
            Arc::clone(&snapshot),
        );
        "queued"
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            req_id.0,
            CreatedRanking {
                id: snapshot.id,
                total_articles: snapshot.total_articles,
                generated_at: snapshot.generated_at,
                initial_scoring,
            },
        )),
    ))
}

/// GET /api/v1/rankings: newest first.
pub(super) async fn list_rankings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RankingListQuery>,
) -> Json<ApiResponse<Vec<RankingSummary>>> {
    let data = state
        .store
        .list()
        .into_iter()
        .take(normalize_limit(query.limit))
        .map(|s| RankingSummary {
            id: s.id,
            source_url: s.source_url.clone(),
            total_articles: s.total_articles,
            pages_navigated: s.pages_navigated,
            is_correctly_sorted: s.is_correctly_sorted,
            generated_at: s.generated_at,
            insight_generated_at: state.store.insight(s.id).map(|i| i.generated_at),
        })
        .collect();

    Json(ApiResponse::new(req_id.0, data))
}

/// GET /api/v1/rankings/current
pub(super) async fn get_current(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<RankingSnapshot>>, ApiError> {
    let snapshot = state
        .store
        .current()
        .ok_or_else(|| ApiError::new(&req_id.0, "not_found", "no rankings recorded yet"))?;
    Ok(Json(ApiResponse::new(req_id.0, Arc::unwrap_or_clone(snapshot))))
}

/// GET /api/v1/rankings/{id}
pub(super) async fn get_ranking(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RankingSnapshot>>, ApiError> {
    let snapshot = snapshot_or_404(&state.store, &req_id.0, &id)?;
    Ok(Json(ApiResponse::new(req_id.0, Arc::unwrap_or_clone(snapshot))))
}

/// GET /api/v1/rankings/{id}/insight
pub(super) async fn get_insight(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Insight>>, ApiError> {
    let snapshot = snapshot_or_404(&state.store, &req_id.0, &id)?;
    let insight = state.store.insight(snapshot.id).ok_or_else(|| {
        ApiError::new(
            &req_id.0,
            "not_found",
            format!("ranking {} has no insight yet", snapshot.id),
        )
    })?;
    Ok(Json(ApiResponse::new(req_id.0, insight)))
}

/// POST /api/v1/rankings/{id}/rescore: score one ranking now, bypassing
/// the scheduler's freshness check.
pub(super) async fn rescore_ranking(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Insight>>, ApiError> {
    let rid = &req_id.0;
    let snapshot = snapshot_or_404(&state.store, rid, &id)?;

    if !state.provider.is_available() {
        return Err(ApiError::new(
            rid,
            "unavailable",
            format!("score provider '{}' is not available", state.provider.name()),
        ));
    }

    let insight = state
        .provider
        .request_scoring(&snapshot)
        .await
        .map_err(|e| map_scoring_error(rid, snapshot.id, &e))?;

    let saved = state
        .store
        .save_insight(snapshot.id, insight)
        .ok_or_else(|| not_found(rid, snapshot.id))?;

    tracing::info!(ranking_id = %snapshot.id, request_id = %saved.request_id, "manual rescore saved");
    Ok(Json(ApiResponse::new(req_id.0, saved)))
}

fn map_scoring_error(req_id: &str, ranking_id: Uuid, error: &ScoringError) -> ApiError {
    tracing::error!(ranking_id = %ranking_id, error = %error, "manual rescore failed");
    match error {
        ScoringError::Unavailable(message) => ApiError::new(req_id, "unavailable", message.clone()),
        other => ApiError::new(req_id, "provider_error", other.to_string()),
    }
}
