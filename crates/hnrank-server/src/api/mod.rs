mod feedback;
mod rankings;
mod scheduler;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use hnrank_scheduler::RescoreScheduler;
use hnrank_scoring::DynScoreProvider;
use hnrank_store::{RankingStore, StoreStats};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::middleware::{request_id, RequestId, REQUEST_ID_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RankingStore>,
    pub provider: DynScoreProvider,
    pub scheduler: RescoreScheduler,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    provider: &'static str,
    provider_available: bool,
    scheduler_running: bool,
    store: StoreStats,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            "provider_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> usize {
    let clamped = limit.unwrap_or(20).clamp(1, 100);
    usize::try_from(clamped).unwrap_or(20)
}

/// Parses a ranking id from a path or query value.
pub(super) fn parse_ranking_id(req_id: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        ApiError::new(
            req_id,
            "validation_error",
            format!("'{raw}' is not a valid ranking id"),
        )
    })
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/rankings",
            get(rankings::list_rankings).post(rankings::create_ranking),
        )
        .route("/api/v1/rankings/current", get(rankings::get_current))
        .route("/api/v1/rankings/{id}", get(rankings::get_ranking))
        .route("/api/v1/rankings/{id}/insight", get(rankings::get_insight))
        .route("/api/v1/rankings/{id}/rescore", post(rankings::rescore_ranking))
        .route(
            "/api/v1/feedback",
            get(feedback::list_feedback).post(feedback::submit_feedback),
        )
        .route("/api/v1/scheduler/status", get(scheduler::status))
        .route("/api/v1/scheduler/run", post(scheduler::run_now))
        .route("/api/v1/scheduler/start", post(scheduler::start))
        .route("/api/v1/scheduler/stop", post(scheduler::stop))
        .route("/api/v1/scheduler/config", patch(scheduler::update_config))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .merge(api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    Json(ApiResponse::new(
        req_id.0,
        HealthData {
            status: "ok",
            provider: state.provider.name(),
            provider_available: state.provider.is_available(),
            scheduler_running: state.scheduler.is_running(),
            store: state.store.stats(),
        },
    ))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
