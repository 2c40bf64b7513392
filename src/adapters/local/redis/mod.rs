//! Redis adapter for local deployment.
//!
//! This module provides Redis-backed implementations of:
//! - `JobQueuePort` for upload-completed events
//! - `VideoRepository` for published video metadata

mod error;
mod pool;
mod queue;
mod repository;

pub use error::RedisAdapterError;
pub use pool::RedisPool;

/// Redis key constants
const JOB_QUEUE: &str = "vodpipe:jobs";
const VIDEO_RECORD_PREFIX: &str = "vodpipe:video:";

fn record_key(video_id: &str) -> String {
    format!("{}{}", VIDEO_RECORD_PREFIX, video_id)
}
