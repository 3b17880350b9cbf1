mod config;
mod error;
mod remote;
mod routes;
mod schemas;
mod state;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use ds_core::delivery::Delivery;
use ds_core::inference::InferenceService;
use ds_core::seed::OsSeedSource;
use ds_core::ChampionOrchestrator;
use log::{error, info, warn};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use crate::config::ServiceConfig;
use crate::remote::{RemoteCodec, RemoteJudge, RemoteModelLoader, RemotePreprocessor, WorkerClient};
use crate::routes::create_router;
use crate::state::AppState;

pub const DEFAULT_LOG_FILTER: &str = "ds_server=info,ds_core=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::load().context("invalid service configuration")?;
    info!("Starting {}", config.api_title);

    let state = Arc::new(build_state(config)?);
    let inference = state.orchestrator.inference().clone();

    prepare(&state).await?;

    let addr = state.config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    inference.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Load the pipeline and, unless disabled, push one duel through it. Either failing aborts startup.
async fn prepare(state: &AppState) -> anyhow::Result<()> {
    state
        .orchestrator
        .inference()
        .startup()
        .await
        .context("failed to load the generation pipeline")?;

    if state.config.warmup {
        state.orchestrator.warm_up().await.context("warm-up failed")?;
    } else {
        warn!("Warm-up disabled, first request pays the cold start");
    }
    Ok(())
}

fn build_state(config: ServiceConfig) -> anyhow::Result<AppState> {
    let timeout = Duration::from_secs(config.http_timeout_secs);
    let worker = WorkerClient::new(&config.worker_url, timeout).context("cannot build worker client")?;
    let judge = WorkerClient::new(&config.judge_url, timeout).context("cannot build judge client")?;

    let inference = Arc::new(InferenceService::new(
        config.inference_config(),
        Arc::new(RemoteModelLoader::new(worker.clone())),
    ));
    let orchestrator = Arc::new(ChampionOrchestrator::new(
        config.defaults,
        inference,
        Arc::new(RemotePreprocessor::new(worker.clone())),
        Arc::new(RemoteJudge::new(judge)),
        Arc::new(OsSeedSource),
    ));
    let delivery = Delivery::new(
        Arc::new(RemoteCodec::new(worker)),
        config.compression,
        config.stream_chunk_size,
    );

    Ok(AppState::new(orchestrator, delivery, config))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
