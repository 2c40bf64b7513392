//! AWS Worker Binary
//!
//! Long-running worker that:
//! 1. Connects to AWS services (S3, SQS, DynamoDB).
//! 2. Runs the WorkerService, pulling upload-completed events from SQS.
//!
//! Environment Variables:
//! - AWS_REGION: AWS region (e.g., us-east-1)
//! - S3_BUCKET: S3 bucket for sources and HLS output
//! - SQS_QUEUE_URL: SQS queue URL for upload-completed events
//! - DYNAMODB_TABLE: DynamoDB table for video metadata
//! - CDN_BASE_URL and the other pipeline settings (see `vodpipe::config`)

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use vodpipe::adapters::aws::{DynamoAdapter, S3Adapter, SqsAdapter};
use vodpipe::adapters::process::TokioProcessRunner;
use vodpipe::{AwsConfig, PipelineConfig, PipelineOrchestrator, WorkerConfig, WorkerService};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "aws worker exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AwsConfig::from_env()?;
    let pipeline_config = PipelineConfig::from_env()?;
    let worker_config = WorkerConfig::from_env()?;

    // Load AWS config
    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    // Create adapters
    let storage = S3Adapter::new(aws_sdk_s3::Client::new(&sdk_config), config.s3_bucket);
    let queue = SqsAdapter::new(aws_sdk_sqs::Client::new(&sdk_config), config.sqs_queue_url);
    let repo = DynamoAdapter::new(aws_sdk_dynamodb::Client::new(&sdk_config), config.dynamodb_table);

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        storage,
        repo,
        TokioProcessRunner::new(),
        pipeline_config,
    ));
    let worker = WorkerService::new(queue, orchestrator, worker_config);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown requested");
        signal.cancel();
    });

    tracing::info!("AWS worker started, polling for jobs");
    worker.run(shutdown).await;
    Ok(())
}
