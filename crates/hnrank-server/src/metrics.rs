use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Installs the global Prometheus recorder and registers metric descriptions.
    ///
    /// # Errors
    ///
    /// Fails if a global recorder is already installed.
    pub fn install() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        hnrank_scheduler::describe_metrics();
        metrics::describe_counter!(
            "initial_scoring_total",
            "Initial scoring attempts for newly created rankings, labelled by outcome."
        );
        Ok(Self { handle })
    }

    #[cfg(test)]
    fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use hnrank_core::{ArticleRecord, NewRanking};
    use hnrank_scheduler::{RescoreScheduler, SchedulerConfig};
    use hnrank_scoring::{DynScoreProvider, MockProvider};
    use hnrank_store::RankingStore;
    use metrics::Recorder;
    use tower::ServiceExt;

    use super::*;

    async fn render(metrics: &Metrics) -> String {
        let response = metrics
            .router()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        String::from_utf8(body.to_vec()).expect("utf8")
    }

    // The only test in this crate that installs the global recorder.
    #[tokio::test]
    async fn installed_recorder_captures_scheduler_cycles() {
        let metrics = Metrics::install().expect("install recorder");

        let store = Arc::new(RankingStore::new(5));
        store.create_snapshot(NewRanking {
            source_url: "https://news.ycombinator.com/newest".to_string(),
            articles: vec![ArticleRecord {
                title: "Show HN: a tiny database".to_string(),
                time_text: "3 minutes ago".to_string(),
                page: 1,
                position: 1,
            }],
            ..NewRanking::default()
        });
        let provider: DynScoreProvider = Arc::new(MockProvider::new());
        let scheduler = RescoreScheduler::new(
            Arc::clone(&store),
            provider,
            SchedulerConfig {
                run_on_start: false,
                ..SchedulerConfig::default()
            },
        );

        let report = scheduler.run_now().await;
        assert_eq!(report.succeeded, 1);

        let text = render(&metrics).await;
        assert!(
            text.contains(r#"rescore_cycles_total{trigger="manual"}"#),
            "got: {text}"
        );
        assert!(
            text.contains(r#"rescore_jobs_total{outcome="succeeded"}"#),
            "got: {text}"
        );
        assert!(text.contains("rescore_cycle_duration_ms"), "got: {text}");
    }

    #[tokio::test]
    async fn metrics_route_renders_recorded_counters() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let key = metrics::Key::from_static_name("rescore_cycles_saturated_total");
        let metadata = metrics::Metadata::new("test", metrics::Level::INFO, None);
        recorder.register_counter(&key, &metadata).increment(2);

        let text = render(&Metrics::from_handle(handle)).await;
        assert!(text.contains("rescore_cycles_saturated_total 2"), "got: {text}");
    }
}
