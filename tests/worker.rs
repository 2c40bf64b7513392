mod common;

use async_trait::async_trait;
use common::{asset, FakeRunner, MemoryRepository, MemoryStorage, CDN};
use std::collections::VecDeque;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vodpipe::application::worker::handle_job;
use vodpipe::config::{PipelineConfig, WorkerConfig};
use vodpipe::domain::jobs::{Job, RunOutcome};
use vodpipe::ports::queue::JobQueuePort;
use vodpipe::{PipelineOrchestrator, WorkerService};

#[derive(Clone, Default)]
struct MemoryQueue {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

#[async_trait]
impl JobQueuePort for MemoryQueue {
    async fn enqueue_job(&self, job: Job) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.jobs.lock().unwrap().push_back(job);
        Ok(())
    }

    async fn dequeue_job(&self, timeout_secs: f64) -> Result<Option<Job>, Box<dyn Error + Send + Sync>> {
        let next = self.jobs.lock().unwrap().pop_front();
        if next.is_none() {
            tokio::time::sleep(Duration::from_secs_f64(timeout_secs)).await;
        }
        Ok(next)
    }
}

fn orchestrator(
    scratch: &std::path::Path,
    repo: &MemoryRepository,
) -> Arc<PipelineOrchestrator<MemoryStorage, MemoryRepository, FakeRunner>> {
    Arc::new(PipelineOrchestrator::new(
        MemoryStorage::with_source(),
        repo.clone(),
        FakeRunner::new(1280, 720, 8.0),
        PipelineConfig::new(CDN, scratch),
    ))
}

#[tokio::test]
async fn worker_drains_queue_and_stops_on_cancel() {
    let scratch = tempfile::tempdir().unwrap();
    let repo = MemoryRepository::default();
    let queue = MemoryQueue::default();
    for id in ["1", "2", "3"] {
        queue
            .enqueue_job(Job::UploadCompleted(asset(id)))
            .await
            .unwrap();
    }
    // A redelivered event must not produce a second record.
    queue
        .enqueue_job(Job::UploadCompleted(asset("1")))
        .await
        .unwrap();

    let worker = WorkerService::new(
        queue.clone(),
        orchestrator(scratch.path(), &repo),
        WorkerConfig {
            concurrency: 2,
            dequeue_timeout: Duration::from_millis(20),
        },
    );
    let shutdown = CancellationToken::new();
    let handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { worker.run(shutdown).await })
    };

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while (repo.len() < 3 || !queue.jobs.lock().unwrap().is_empty())
        && tokio::time::Instant::now() < deadline
    {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("worker did not stop")
        .unwrap();

    assert_eq!(repo.len(), 3);
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn worker_stops_promptly_when_idle() {
    let scratch = tempfile::tempdir().unwrap();
    let repo = MemoryRepository::default();
    let worker = WorkerService::new(
        MemoryQueue::default(),
        orchestrator(scratch.path(), &repo),
        WorkerConfig {
            concurrency: 1,
            dequeue_timeout: Duration::from_secs(30),
        },
    );

    let shutdown = CancellationToken::new();
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(2), worker.run(shutdown))
        .await
        .expect("idle worker ignored cancellation");
}

#[tokio::test]
async fn handle_job_reports_skip_for_known_video() {
    let scratch = tempfile::tempdir().unwrap();
    let repo = MemoryRepository::default();
    let orchestrator = orchestrator(scratch.path(), &repo);

    let first = handle_job(&orchestrator, Job::UploadCompleted(asset("77")))
        .await
        .unwrap();
    assert!(matches!(first, RunOutcome::Completed(_)));

    let second = handle_job(&orchestrator, Job::UploadCompleted(asset("77")))
        .await
        .unwrap();
    assert!(matches!(second, RunOutcome::Skipped { .. }));
}
