mod api;
mod metrics;
mod middleware;

use std::sync::Arc;

use hnrank_scheduler::{RescoreScheduler, SchedulerConfig};
use hnrank_scoring::{build_provider, ProviderSettings};
use hnrank_store::RankingStore;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    metrics::Metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = hnrank_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let metrics = Metrics::install()?;

    let store = Arc::new(RankingStore::new(config.history_capacity));
    let provider = build_provider(&ProviderSettings::from_app_config(&config))?;
    let scheduler = RescoreScheduler::new(
        Arc::clone(&store),
        Arc::clone(&provider),
        SchedulerConfig::from_app_config(&config),
    );
    scheduler.start(None);

    let app = build_app(AppState {
        store,
        provider,
        scheduler: scheduler.clone(),
    })
    .merge(metrics.router());

    tracing::info!(bind_addr = %config.bind_addr, env = ?config.env, "hnrank-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
