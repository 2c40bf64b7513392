//! Monolith Binary - Single-server deployment
//!
//! It wires up:
//! - Local adapters (filesystem storage, Redis queue and metadata)
//! - HTTP trigger endpoint for upload-completed events
//! - A worker pool running the ingestion pipeline

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use vodpipe::adapters::local::http::{router, TriggerState};
use vodpipe::adapters::local::{FsAdapter, RedisPool};
use vodpipe::adapters::process::TokioProcessRunner;
use vodpipe::{LocalConfig, PipelineConfig, PipelineOrchestrator, WorkerConfig, WorkerService};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "monolith exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = LocalConfig::from_env();
    let pipeline_config = PipelineConfig::from_env()?;
    let worker_config = WorkerConfig::from_env()?;

    // 1. Adapters (Local implementations)
    let redis = RedisPool::new(&config.redis_url)?;
    let storage = FsAdapter::new(&config.storage_root);

    // 2. Application Services
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        storage,
        redis.clone(),
        TokioProcessRunner::new(),
        pipeline_config,
    ));
    let worker = WorkerService::new(redis.clone(), orchestrator, worker_config);

    // 3. Start Workers
    let shutdown = CancellationToken::new();
    let worker_shutdown = shutdown.clone();
    let worker_handle = tokio::spawn(async move { worker.run(worker_shutdown).await });

    // 4. HTTP trigger
    let app = router(TriggerState::new(Arc::new(redis)));
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port)).await?;
    tracing::info!(addr = %config.addr, port = %config.port, "listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    worker_handle.await?;
    Ok(())
}
