use std::str::FromStr;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use hnrank_core::{FeedbackEntry, NewFeedback, Vote};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{parse_ranking_id, ApiError, ApiResponse, AppState};

const MAX_NOTES_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub(super) struct FeedbackRequest {
    pub ranking_id: String,
    pub article_position: i64,
    pub vote: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FeedbackQuery {
    pub ranking_id: Option<String>,
}

/// POST /api/v1/feedback: validate against the stored ranking, then append.
pub(super) async fn submit_feedback(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FeedbackEntry>>), ApiError> {
    let rid = &req_id.0;

    let ranking_id = parse_ranking_id(rid, &body.ranking_id)?;
    let snapshot = state.store.get(ranking_id).ok_or_else(|| {
        ApiError::new(rid, "not_found", format!("ranking {ranking_id} not found"))
    })?;

    let article_position = u32::try_from(body.article_position)
        .ok()
        .filter(|p| snapshot.contains_position(*p))
        .ok_or_else(|| {
            ApiError::new(
                rid,
                "validation_error",
                format!(
                    "article_position must be between 1 and {}, got {}",
                    snapshot.articles.len(),
                    body.article_position
                ),
            )
        })?;

    let vote = Vote::from_str(&body.vote)
        .map_err(|message| ApiError::new(rid, "validation_error", message))?;

    let notes = body
        .notes
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty());
    if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_CHARS) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("notes must be at most {MAX_NOTES_CHARS} characters"),
        ));
    }

    let entry = state.store.add_feedback(NewFeedback {
        ranking_id,
        article_position,
        vote,
        notes,
    });
    tracing::info!(
        ranking_id = %ranking_id,
        article_position,
        vote = %vote,
        "feedback recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, entry)),
    ))
}

/// GET /api/v1/feedback: newest first, optionally for one ranking.
pub(super) async fn list_feedback(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FeedbackQuery>,
) -> Result<Json<ApiResponse<Vec<FeedbackEntry>>>, ApiError> {
    let filter = query
        .ranking_id
        .as_deref()
        .map(|raw| parse_ranking_id(&req_id.0, raw))
        .transpose()?;
    let data = state.store.list_feedback(filter);
    Ok(Json(ApiResponse::new(req_id.0, data)))
}
