//! Redis VideoRepository implementation.

use super::error::RedisAdapterError;
use super::pool::RedisPool;
use super::record_key;
use crate::domain::jobs::VideoMetadataRecord;
use crate::ports::repository::VideoRepository;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;

#[async_trait]
impl VideoRepository for RedisPool {
    async fn find_by_video_id(
        &self,
        video_id: &str,
    ) -> Result<Option<VideoMetadataRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.connection().await?;
        let json: Option<String> = conn
            .get(record_key(video_id))
            .await
            .map_err(RedisAdapterError::from)?;
        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn insert_if_absent(
        &self,
        record: &VideoMetadataRecord,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(record)?;
        // SET NX: only the first writer for a video id wins.
        let inserted: bool = conn
            .set_nx(record_key(&record.video_id), json)
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(inserted)
    }
}
