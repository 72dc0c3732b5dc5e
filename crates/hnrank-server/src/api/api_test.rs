use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use hnrank_core::{ArticleRecord, NewRanking};
use hnrank_scheduler::SchedulerConfig;
use hnrank_scoring::{DisabledProvider, MockProvider};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;

fn state_with(provider: DynScoreProvider) -> AppState {
    let store = Arc::new(RankingStore::new(5));
    let scheduler = RescoreScheduler::new(
        Arc::clone(&store),
        Arc::clone(&provider),
        SchedulerConfig {
            interval: Duration::from_secs(3600),
            max_concurrent_jobs: 3,
            stale_after: Duration::from_secs(7200),
            run_on_start: false,
        },
    );
    AppState {
        store,
        provider,
        scheduler,
    }
}

fn mock_state() -> AppState {
    state_with(Arc::new(MockProvider::new()))
}

fn ranking_body(n: u32) -> Value {
    let articles: Vec<ArticleRecord> = (1..=n)
        .map(|position| ArticleRecord {
            title: format!("Story {position}"),
            time_text: format!("{position} minutes ago"),
            page: 1,
            position,
        })
        .collect();
    json!({
        "source_url": "https://news.ycombinator.com/newest",
        "pages_navigated": 1,
        "is_correctly_sorted": true,
        "articles": articles,
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json parse")
    };
    (status, json)
}

fn seed(state: &AppState, n: u32) -> Uuid {
    let new: NewRanking = serde_json::from_value(ranking_body(n)).expect("ranking body");
    state.store.create_snapshot(new).id
}

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 20);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(-5)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 100);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("not_found", StatusCode::NOT_FOUND),
        ("validation_error", StatusCode::BAD_REQUEST),
        ("unavailable", StatusCode::SERVICE_UNAVAILABLE),
        ("provider_error", StatusCode::BAD_GATEWAY),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, expected) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), expected, "code {code}");
    }
}

#[tokio::test]
async fn health_reports_provider_and_store() {
    let state = mock_state();
    seed(&state, 2);
    let app = build_app(state);

    let (status, json) = send(&app, "GET", "/api/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["provider"], "mock");
    assert_eq!(json["data"]["provider_available"], true);
    assert_eq!(json["data"]["scheduler_running"], false);
    assert_eq!(json["data"]["store"]["snapshots"], 1);
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn create_then_fetch_current_and_by_id() {
    let app = build_app(state_with(Arc::new(DisabledProvider)));

    let (status, created) = send(&app, "POST", "/api/v1/rankings", Some(ranking_body(3))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["total_articles"], 3);
    assert_eq!(created["data"]["initial_scoring"], "skipped_unavailable");
    let id = created["data"]["id"].as_str().expect("id").to_string();

    let (status, current) = send(&app, "GET", "/api/v1/rankings/current", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["data"]["id"], id.as_str());
    assert_eq!(current["data"]["articles"].as_array().map(Vec::len), Some(3));

    let (status, by_id) = send(&app, "GET", &format!("/api/v1/rankings/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_id["data"]["source_url"], "https://news.ycombinator.com/newest");
}

#[tokio::test]
async fn create_schedules_initial_scoring() {
    let state = mock_state();
    let store = Arc::clone(&state.store);
    let app = build_app(state);

    let (status, created) = send(&app, "POST", "/api/v1/rankings", Some(ranking_body(2))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["initial_scoring"], "queued");
    let id = Uuid::parse_str(created["data"]["id"].as_str().expect("id")).expect("uuid");

    let mut saved = false;
    for _ in 0..50 {
        if store.insight(id).is_some() {
            saved = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(saved, "initial scoring should save an insight");
}

#[tokio::test]
async fn create_with_empty_articles_skips_initial_scoring() {
    let app = build_app(mock_state());
    let body = json!({ "source_url": "https://news.ycombinator.com/newest" });

    let (status, created) = send(&app, "POST", "/api/v1/rankings", Some(body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["total_articles"], 0);
    assert_eq!(created["data"]["initial_scoring"], "skipped_empty");
}

#[tokio::test]
async fn create_rejects_blank_source_url() {
    let app = build_app(mock_state());
    let mut body = ranking_body(1);
    body["source_url"] = json!("  ");

    let (status, json) = send(&app, "POST", "/api/v1/rankings", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn current_is_404_when_empty() {
    let app = build_app(mock_state());
    let (status, json) = send(&app, "GET", "/api/v1/rankings/current", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_rejected() {
    let app = build_app(mock_state());

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/rankings/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&app, "GET", "/api/v1/rankings/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn list_is_newest_first_and_limited() {
    let state = mock_state();
    let first = seed(&state, 1);
    let second = seed(&state, 1);
    let third = seed(&state, 1);
    let app = build_app(state);

    let (status, json) = send(&app, "GET", "/api/v1/rankings?limit=2", None).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json["data"]
        .as_array()
        .expect("data array")
        .iter()
        .filter_map(|r| r["id"].as_str())
        .collect();
    assert_eq!(ids, vec![third.to_string(), second.to_string()]);
    assert!(!ids.contains(&first.to_string().as_str()));
}

#[tokio::test]
async fn insight_is_404_until_rescored() {
    let state = mock_state();
    let id = seed(&state, 3);
    let app = build_app(state);
    let insight_uri = format!("/api/v1/rankings/{id}/insight");

    let (status, _) = send(&app, "GET", &insight_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, rescored) = send(&app, "POST", &format!("/api/v1/rankings/{id}/rescore"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rescored["data"]["ranking_id"], id.to_string());
    assert_eq!(rescored["data"]["success"], true);

    let (status, insight) = send(&app, "GET", &insight_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(insight["data"]["request_id"], rescored["data"]["request_id"]);
}

#[tokio::test]
async fn rescore_with_unavailable_provider_is_503() {
    let state = state_with(Arc::new(DisabledProvider));
    let id = seed(&state, 3);
    let app = build_app(state);

    let (status, json) = send(&app, "POST", &format!("/api/v1/rankings/{id}/rescore"), None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "unavailable");
}

#[tokio::test]
async fn rescore_with_failing_provider_is_502() {
    let state = state_with(Arc::new(
        MockProvider::new().failing_for("https://news.ycombinator.com/newest"),
    ));
    let id = seed(&state, 3);
    let store = Arc::clone(&state.store);
    let app = build_app(state);

    let (status, json) = send(&app, "POST", &format!("/api/v1/rankings/{id}/rescore"), None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "provider_error");
    assert!(store.insight(id).is_none());
}

#[tokio::test]
async fn feedback_is_validated_and_listed() {
    let state = mock_state();
    let id = seed(&state, 3);
    let other = seed(&state, 3);
    let app = build_app(state);

    let (status, created) = send(
        &app,
        "POST",
        "/api/v1/feedback",
        Some(json!({ "ranking_id": id, "article_position": 2, "vote": "promote", "notes": " great " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["vote"], "promote");
    assert_eq!(created["data"]["notes"], "great");

    send(
        &app,
        "POST",
        "/api/v1/feedback",
        Some(json!({ "ranking_id": other, "article_position": 1, "vote": "demote" })),
    )
    .await;

    let (status, all) = send(&app, "GET", "/api/v1/feedback", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(all["data"][0]["vote"], "demote");

    let (status, filtered) = send(&app, "GET", &format!("/api/v1/feedback?ranking_id={id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(filtered["data"][0]["article_position"], 2);
}

#[tokio::test]
async fn feedback_rejects_bad_input() {
    let state = mock_state();
    let id = seed(&state, 3);
    let store = Arc::clone(&state.store);
    let app = build_app(state);

    let cases = [
        (json!({ "ranking_id": id, "article_position": 0, "vote": "promote" }), StatusCode::BAD_REQUEST),
        (json!({ "ranking_id": id, "article_position": 4, "vote": "promote" }), StatusCode::BAD_REQUEST),
        (json!({ "ranking_id": id, "article_position": -1, "vote": "promote" }), StatusCode::BAD_REQUEST),
        (json!({ "ranking_id": id, "article_position": 1, "vote": "love" }), StatusCode::BAD_REQUEST),
        (json!({ "ranking_id": "nope", "article_position": 1, "vote": "promote" }), StatusCode::BAD_REQUEST),
        (
            json!({ "ranking_id": Uuid::new_v4(), "article_position": 1, "vote": "promote" }),
            StatusCode::NOT_FOUND,
        ),
    ];

    for (body, expected) in cases {
        let (status, _) = send(&app, "POST", "/api/v1/feedback", Some(body.clone())).await;
        assert_eq!(status, expected, "body {body}");
    }
    assert!(store.list_feedback(None).is_empty());
}

#[tokio::test]
async fn scheduler_lifecycle_routes() {
    let app = build_app(mock_state());

    let (status, json) = send(&app, "GET", "/api/v1/scheduler/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["running"], false);
    assert_eq!(json["data"]["max_concurrent_jobs"], 3);

    let (_, started) = send(&app, "POST", "/api/v1/scheduler/start?interval_secs=600", None).await;
    assert_eq!(started["data"]["changed"], true);
    assert_eq!(started["data"]["status"]["running"], true);
    assert_eq!(started["data"]["status"]["interval_secs"], 600);

    let (_, again) = send(&app, "POST", "/api/v1/scheduler/start", None).await;
    assert_eq!(again["data"]["changed"], false);

    let (_, stopped) = send(&app, "POST", "/api/v1/scheduler/stop", None).await;
    assert_eq!(stopped["data"]["changed"], true);
    assert_eq!(stopped["data"]["status"]["running"], false);

    let (_, again) = send(&app, "POST", "/api/v1/scheduler/stop", None).await;
    assert_eq!(again["data"]["changed"], false);
}

#[tokio::test]
async fn scheduler_rejects_intervals_above_maximum() {
    let state = mock_state();
    let scheduler = state.scheduler.clone();
    let app = build_app(state);

    let (status, json) = send(
        &app,
        "POST",
        &format!("/api/v1/scheduler/start?interval_secs={}", u64::MAX),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert!(!scheduler.is_running());

    let (status, json) = send(
        &app,
        "PATCH",
        "/api/v1/scheduler/config",
        Some(json!({ "interval_secs": u64::MAX })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(scheduler.status().interval_secs, 3600);
}

#[tokio::test]
async fn scheduler_run_scores_pending_rankings() {
    let state = mock_state();
    let id = seed(&state, 2);
    seed(&state, 0);
    let store = Arc::clone(&state.store);
    let app = build_app(state);

    let (status, json) = send(&app, "POST", "/api/v1/scheduler/run", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["trigger"], "manual");
    assert_eq!(json["data"]["selected"], 1);
    assert_eq!(json["data"]["succeeded"], 1);
    assert!(store.insight(id).is_some());
}

#[tokio::test]
async fn scheduler_config_validates_and_applies() {
    let app = build_app(mock_state());

    let (status, json) = send(
        &app,
        "PATCH",
        "/api/v1/scheduler/config",
        Some(json!({ "max_concurrent_jobs": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");

    let (status, json) = send(
        &app,
        "PATCH",
        "/api/v1/scheduler/config",
        Some(json!({ "max_concurrent_jobs": 5, "stale_after_secs": 600 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["max_concurrent_jobs"], 5);
    assert_eq!(json["data"]["stale_after_secs"], 600);
}

#[tokio::test]
async fn request_id_header_is_echoed_in_meta() {
    let app = build_app(mock_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header(REQUEST_ID_HEADER, "trace-123")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(json["meta"]["request_id"], "trace-123");
}
