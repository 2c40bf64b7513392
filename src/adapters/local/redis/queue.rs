//! Redis JobQueuePort implementation.

use super::error::RedisAdapterError;
use super::pool::RedisPool;
use super::JOB_QUEUE;
use crate::domain::jobs::Job;
use crate::ports::queue::JobQueuePort;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;

#[async_trait]
impl JobQueuePort for RedisPool {
    async fn enqueue_job(&self, job: Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(&job)?;
        conn.lpush::<_, _, ()>(JOB_QUEUE, json)
            .await
            .map_err(RedisAdapterError::from)?;
        Ok(())
    }

    async fn dequeue_job(
        &self,
        timeout_secs: f64,
    ) -> Result<Option<Job>, Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.connection().await?;
        let result: Option<(String, String)> = conn
            .brpop(JOB_QUEUE, timeout_secs)
            .await
            .map_err(RedisAdapterError::from)?;
        match result {
            Some((_, json)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
