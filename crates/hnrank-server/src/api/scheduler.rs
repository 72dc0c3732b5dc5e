use std::time::Duration;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use hnrank_scheduler::{CycleReport, SchedulerConfigUpdate, SchedulerStatus, MAX_INTERVAL};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct StartQuery {
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(super) struct LifecycleResult {
    /// `false` when the scheduler was already in the requested state.
    changed: bool,
    status: SchedulerStatus,
}

/// GET /api/v1/scheduler/status
pub(super) async fn status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<SchedulerStatus>> {
    Json(ApiResponse::new(req_id.0, state.scheduler.status()))
}

/// POST /api/v1/scheduler/run: run one cycle and wait for it to settle.
pub(super) async fn run_now(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<CycleReport>> {
    let report = state.scheduler.run_now().await;
    Json(ApiResponse::new(req_id.0, report))
}

/// POST /api/v1/scheduler/start
pub(super) async fn start(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<StartQuery>,
) -> Result<Json<ApiResponse<LifecycleResult>>, ApiError> {
    if query.interval_secs == Some(0) {
        return Err(ApiError::new(
            &req_id.0,
            "validation_error",
            "interval_secs must be greater than zero",
        ));
    }
    if query
        .interval_secs
        .is_some_and(|secs| secs > MAX_INTERVAL.as_secs())
    {
        return Err(ApiError::new(
            &req_id.0,
            "validation_error",
            format!("interval_secs must be at most {}", MAX_INTERVAL.as_secs()),
        ));
    }
    let changed = state
        .scheduler
        .start(query.interval_secs.map(Duration::from_secs));
    Ok(Json(ApiResponse::new(
        req_id.0,
        LifecycleResult {
            changed,
            status: state.scheduler.status(),
        },
    )))
}

/// POST /api/v1/scheduler/stop
pub(super) async fn stop(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<LifecycleResult>> {
    let changed = state.scheduler.stop();
    Json(ApiResponse::new(
        req_id.0,
        LifecycleResult {
            changed,
            status: state.scheduler.status(),
        },
    ))
}

/// PATCH /api/v1/scheduler/config
pub(super) async fn update_config(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(update): Json<SchedulerConfigUpdate>,
) -> Result<Json<ApiResponse<SchedulerStatus>>, ApiError> {
    let status = state
        .scheduler
        .update_config(update)
        .map_err(|e| ApiError::new(&req_id.0, "validation_error", e.to_string()))?;
    Ok(Json(ApiResponse::new(req_id.0, status)))
}
