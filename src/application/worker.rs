use crate::application::orchestrator::PipelineOrchestrator;
use crate::config::WorkerConfig;
use crate::domain::jobs::{Job, RunOutcome};
use crate::error::PipelineError;
use crate::ports::process::ProcessRunner;
use crate::ports::queue::JobQueuePort;
use crate::ports::repository::VideoRepository;
use crate::ports::storage::StoragePort;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pulls upload events off the queue and runs each through the pipeline,
/// at most `concurrency` at a time.
pub struct WorkerService<Q, S, P, R> {
    queue: Q,
    orchestrator: Arc<PipelineOrchestrator<S, P, R>>,
    config: WorkerConfig,
}

impl<Q, S, P, R> WorkerService<Q, S, P, R>
where
    Q: JobQueuePort,
    S: StoragePort + 'static,
    P: VideoRepository + 'static,
    R: ProcessRunner + 'static,
{
    pub fn new(
        queue: Q,
        orchestrator: Arc<PipelineOrchestrator<S, P, R>>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            orchestrator,
            config,
        }
    }

    /// Runs until `shutdown` is cancelled, then waits for in-flight runs.
    /// A failed run is logged and never stops the loop; redelivery is the
    /// queue's business.
    pub async fn run(&self, shutdown: CancellationToken) {
        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut in_flight = JoinSet::new();
        let timeout_secs = self.config.dequeue_timeout.as_secs_f64();

        info!(concurrency = self.config.concurrency, "worker started");
        loop {
            // Reap finished tasks so the set does not grow unbounded.
            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    error!(error = %e, "pipeline task panicked");
                }
            }

            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let job = tokio::select! {
                _ = shutdown.cancelled() => break,
                job = self.queue.dequeue_job(timeout_secs) => job,
            };

            match job {
                Ok(Some(job)) => {
                    let orchestrator = self.orchestrator.clone();
                    in_flight.spawn(async move {
                        let _permit = permit;
                        match handle_job(&orchestrator, job).await {
                            Ok(outcome) => debug!(?outcome, "job finished"),
                            // Already logged inside the pipeline span.
                            Err(e) => debug!(error = %e, "job failed"),
                        }
                    });
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "queue error, backing off");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
                    }
                }
            }
        }

        info!(in_flight = in_flight.len(), "worker stopping, draining runs");
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "pipeline task panicked");
            }
        }
        info!("worker stopped");
    }
}

/// Dispatches one queued job to the pipeline.
pub async fn handle_job<S, P, R>(
    orchestrator: &PipelineOrchestrator<S, P, R>,
    job: Job,
) -> Result<RunOutcome, PipelineError>
where
    S: StoragePort,
    P: VideoRepository,
    R: ProcessRunner,
{
    match job {
        Job::UploadCompleted(asset) => {
            let outcome = orchestrator.run(&asset).await;
            if let Ok(RunOutcome::Skipped { video_id }) = &outcome {
                debug!(video_id = %video_id, "duplicate delivery ignored");
            }
            outcome
        }
    }
}
