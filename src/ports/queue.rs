use crate::domain::jobs::Job;
use async_trait::async_trait;
use std::error::Error;

#[async_trait]
pub trait JobQueuePort: Send + Sync {
    /// Enqueue a job
    async fn enqueue_job(&self, job: Job) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Dequeue a job, waiting at most `timeout_secs`.
    /// `Ok(None)` means the wait elapsed with nothing to do.
    async fn dequeue_job(
        &self,
        timeout_secs: f64,
    ) -> Result<Option<Job>, Box<dyn Error + Send + Sync>>;
}
