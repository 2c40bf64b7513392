use crate::domain::jobs::VideoMetadataRecord;
use async_trait::async_trait;
use std::error::Error;

/// Durable store of published video metadata, keyed by video id.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn find_by_video_id(
        &self,
        video_id: &str,
    ) -> Result<Option<VideoMetadataRecord>, Box<dyn Error + Send + Sync>>;

    /// Create-only write. Returns `false` when a record for the same video
    /// id already exists, leaving it untouched.
    async fn insert_if_absent(
        &self,
        record: &VideoMetadataRecord,
    ) -> Result<bool, Box<dyn Error + Send + Sync>>;
}
