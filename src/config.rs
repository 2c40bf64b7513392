//! Configuration for different deployment environments.
//!
//! Everything is read once at startup and handed to the services
//! explicitly; nothing below the binaries touches the environment.

use crate::domain::av::ladder::{default_ladder, RenditionSpec};
use crate::domain::is_path_safe;
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} env var required")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("RENDITIONS is not a valid ladder: {0}")]
    Renditions(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Wall-clock limits for each external process invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeouts {
    pub probe: Duration,
    /// Applies to each rendition's encode separately.
    pub encode: Duration,
    pub thumbnail: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(60),
            encode: Duration::from_secs(60 * 60),
            thumbnail: Duration::from_secs(60),
        }
    }
}

/// Everything the pipeline orchestrator needs to run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Prefix for every public URL, without trailing slash.
    pub cdn_base_url: String,
    /// Parent directory of per-run scratch workspaces
    pub scratch_root: PathBuf,
    /// Candidate ladder, lowest quality first
    pub renditions: Vec<RenditionSpec>,
    pub timeouts: Timeouts,
    /// Rung encodes allowed to run at once within one run
    pub rendition_concurrency: usize,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub segment_seconds: u32,
    pub thumbnail_offset_seconds: f64,
    /// Delete objects left under the output prefix by an earlier attempt
    pub purge_stale_outputs: bool,
}

impl PipelineConfig {
    pub fn new(cdn_base_url: impl Into<String>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            cdn_base_url: cdn_base_url.into(),
            scratch_root: scratch_root.into(),
            renditions: default_ladder(),
            timeouts: Timeouts::default(),
            rendition_concurrency: 1,
            ffmpeg_path: String::from("ffmpeg"),
            ffprobe_path: String::from("ffprobe"),
            segment_seconds: 6,
            thumbnail_offset_seconds: 1.0,
            purge_stale_outputs: false,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cdn_base_url = lookup("CDN_BASE_URL").ok_or(ConfigError::Missing("CDN_BASE_URL"))?;
        let scratch_root = lookup("SCRATCH_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let mut config = Self::new(cdn_base_url, scratch_root);

        if let Some(raw) = lookup("RENDITIONS") {
            config.renditions = serde_json::from_str(&raw)?;
        }
        if let Some(v) = parse_var(&lookup, "RENDITION_CONCURRENCY")? {
            config.rendition_concurrency = v;
        }
        if let Some(v) = parse_var(&lookup, "PROBE_TIMEOUT_SECS")? {
            config.timeouts.probe = Duration::from_secs(v);
        }
        if let Some(v) = parse_var(&lookup, "ENCODE_TIMEOUT_SECS")? {
            config.timeouts.encode = Duration::from_secs(v);
        }
        if let Some(v) = parse_var(&lookup, "THUMBNAIL_TIMEOUT_SECS")? {
            config.timeouts.thumbnail = Duration::from_secs(v);
        }
        if let Some(v) = lookup("FFMPEG_PATH") {
            config.ffmpeg_path = v;
        }
        if let Some(v) = lookup("FFPROBE_PATH") {
            config.ffprobe_path = v;
        }
        if let Some(v) = parse_var(&lookup, "PURGE_STALE_OUTPUTS")? {
            config.purge_stale_outputs = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        if self.cdn_base_url.trim().is_empty() {
            return invalid("cdn_base_url is empty".into());
        }
        if self.rendition_concurrency == 0 {
            return invalid("rendition_concurrency must be at least 1".into());
        }
        if self.segment_seconds == 0 {
            return invalid("segment_seconds must be at least 1".into());
        }
        let Timeouts {
            probe,
            encode,
            thumbnail,
        } = &self.timeouts;
        if probe.is_zero() || encode.is_zero() || thumbnail.is_zero() {
            return invalid("timeouts must be non-zero".into());
        }

        let mut seen = HashSet::new();
        for spec in &self.renditions {
            if !is_path_safe(&spec.name) {
                return invalid(format!("rendition name {:?} is not path-safe", spec.name));
            }
            if !seen.insert(spec.name.as_str()) {
                return invalid(format!("duplicate rendition name {:?}", spec.name));
            }
            if spec.target_width == 0 || spec.target_height == 0 || spec.video_bitrate_kbps == 0 {
                return invalid(format!("rendition {:?} has a zero dimension or bitrate", spec.name));
            }
            if spec.audio_bitrate.trim().is_empty() {
                return invalid(format!("rendition {:?} has no audio bitrate", spec.name));
            }
        }
        Ok(())
    }
}

/// Queue worker settings.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerConfig {
    /// Pipeline runs in flight at once
    pub concurrency: usize,
    /// How long one dequeue call may block
    pub dequeue_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            dequeue_timeout: Duration::from_secs(5),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, "WORKER_CONCURRENCY")? {
            config.concurrency = v;
        }
        if let Some(v) = parse_var(&lookup, "DEQUEUE_TIMEOUT_SECS")? {
            config.dequeue_timeout = Duration::from_secs(v);
        }
        if config.concurrency == 0 {
            return Err(ConfigError::Validation(
                "WORKER_CONCURRENCY must be at least 1".into(),
            ));
        }
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Configuration for local/monolith deployment.
#[cfg(feature = "local")]
#[derive(Clone, Debug)]
pub struct LocalConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Redis connection URL
    pub redis_url: String,
    /// Root directory standing in for the object store
    pub storage_root: PathBuf,
}

#[cfg(feature = "local")]
impl LocalConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("3000")),
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| String::from("redis://127.0.0.1/")),
            storage_root: env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./storage")),
        }
    }
}

/// Configuration for AWS deployment.
#[cfg(feature = "aws")]
#[derive(Clone, Debug)]
pub struct AwsConfig {
    /// S3 bucket for source uploads and HLS output
    pub s3_bucket: String,
    /// SQS queue URL for upload-completed events
    pub sqs_queue_url: String,
    /// DynamoDB table for video metadata
    pub dynamodb_table: String,
}

#[cfg(feature = "aws")]
impl AwsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let required = |name: &'static str| env::var(name).map_err(|_| ConfigError::Missing(name));

        Ok(Self {
            s3_bucket: required("S3_BUCKET")?,
            sqs_queue_url: required("SQS_QUEUE_URL")?,
            dynamodb_table: required("DYNAMODB_TABLE")?,
        })
    }
}
