use crate::domain::jobs::Job;
use crate::ports::queue::JobQueuePort;
use async_trait::async_trait;
use aws_sdk_sqs::Client;
use std::error::Error;
use tracing::warn;

/// Longest long-poll SQS accepts.
const MAX_WAIT_SECONDS: i32 = 20;

/// SqsAdapter implements JobQueuePort for AWS SQS.
#[derive(Clone)]
pub struct SqsAdapter {
    client: Client,
    queue_url: String,
}

impl SqsAdapter {
    pub fn new(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

#[async_trait]
impl JobQueuePort for SqsAdapter {
    async fn enqueue_job(&self, job: Job) -> Result<(), Box<dyn Error + Send + Sync>> {
        let message_body = serde_json::to_string(&job)?;
        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(message_body)
            .send()
            .await?;
        Ok(())
    }

    async fn dequeue_job(
        &self,
        timeout_secs: f64,
    ) -> Result<Option<Job>, Box<dyn Error + Send + Sync>> {
        let wait_time = (timeout_secs.ceil() as i32).clamp(0, MAX_WAIT_SECONDS);
        let resp = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(wait_time)
            .send()
            .await?;

        let Some(msg) = resp.messages.and_then(|m| m.into_iter().next()) else {
            return Ok(None);
        };

        // The message is removed on receipt; a crashed run is not redelivered
        // from here, but a duplicate delivery is absorbed by the idempotency check.
        if let Some(receipt_handle) = msg.receipt_handle() {
            self.client
                .delete_message()
                .queue_url(&self.queue_url)
                .receipt_handle(receipt_handle)
                .send()
                .await?;
        }

        match msg.body().map(serde_json::from_str::<Job>) {
            Some(Ok(job)) => Ok(Some(job)),
            Some(Err(e)) => {
                warn!(error = %e, "dropping malformed queue message");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
