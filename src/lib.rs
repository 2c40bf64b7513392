//! vodpipe - Video ingestion and HLS packaging pipeline
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (probe parsing, ladder, hls, jobs)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations
//! - application/: Generic services (orchestrator, worker, storage gateway)
//! - config: Environment configuration
//! - error: Error taxonomy
//!
//! # Features
//! - `local`: Monolith deployment (filesystem storage, Redis, HTTP trigger)
//! - `aws`: AWS deployment (S3, SQS, DynamoDB)
//! - `full`: All features

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use application::orchestrator::PipelineOrchestrator;
pub use application::worker::WorkerService;
pub use config::{PipelineConfig, WorkerConfig};
pub use domain::jobs::{Job, RunOutcome, SourceAsset, VideoMetadataRecord};
pub use error::PipelineError;

#[cfg(feature = "aws")]
pub use config::AwsConfig;

#[cfg(feature = "local")]
pub use config::LocalConfig;
