use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::coordinator::ScanCoordinator;
use crate::application::workflow::{JobWorkflow, WorkflowError};
use crate::domain::{ScanJob, ScanReport};
use crate::infrastructure::artifacts::ArtifactStore;
use crate::infrastructure::cancellation::CancellationRegistry;

/// Message delivered to the background worker pool when a new scan job is queued.
#[derive(Debug)]
pub struct QueuedScan {
    pub job: ScanJob,
    pub cancel: CancellationToken,
}

/// Errors that can occur when enqueuing a job.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum JobQueueError {
    #[error("Job queue is full ({capacity} jobs waiting)")]
    QueueFull { capacity: usize },

    #[error("Job queue is closed")]
    Closed,
}

/// Handle that allows HTTP handlers to push jobs into the background worker queue.
#[derive(Clone)]
pub struct JobQueueHandle {
    sender: mpsc::Sender<QueuedScan>,
    capacity: usize,
}

/// Receiving end, consumed by [`spawn_job_worker_pool`].
pub struct JobQueueReceiver {
    receiver: mpsc::Receiver<QueuedScan>,
}

/// Bounded job queue. Submissions fail fast once `capacity` jobs are waiting.
pub fn job_queue(capacity: usize) -> (JobQueueHandle, JobQueueReceiver) {
    let capacity = capacity.max(1);
    let (sender, receiver) = mpsc::channel(capacity);
    (
        JobQueueHandle { sender, capacity },
        JobQueueReceiver { receiver },
    )
}

impl JobQueueHandle {
    pub fn enqueue(&self, job: QueuedScan) -> Result<(), JobQueueError> {
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => JobQueueError::QueueFull {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => JobQueueError::Closed,
        })
    }

    /// Jobs currently waiting for a worker
    pub fn depth(&self) -> usize {
        self.capacity - self.sender.capacity()
    }
}

/// Shared dependencies required by the job workers.
#[derive(Clone)]
pub struct JobWorkerContext {
    pub workflow: Arc<JobWorkflow>,
    pub coordinator: Arc<ScanCoordinator>,
    pub cancellations: Arc<CancellationRegistry>,
    pub artifacts: ArtifactStore,
}

/// Spawn a worker pool that consumes queued jobs and processes them in the background.
///
/// The pool stops taking jobs once `shutdown` fires; jobs already running
/// keep their own cancellation tokens. Jobs still queued at that point are
/// failed and released from the cancellation registry.
pub fn spawn_job_worker_pool(
    context: JobWorkerContext,
    queue: JobQueueReceiver,
    max_concurrent_jobs: usize,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let concurrency = max_concurrent_jobs.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut receiver = queue.receiver;

    tokio::spawn(async move {
        info!("Job worker pool started with concurrency: {}", concurrency);

        loop {
            // Wait for a permit before taking a job off the queue
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(err) => {
                        error!(error = %err, "Failed to acquire concurrency permit for job processing");
                        break;
                    }
                },
            };

            let queued = tokio::select! {
                _ = shutdown.cancelled() => break,
                queued = receiver.recv() => match queued {
                    Some(queued) => queued,
                    None => break,
                },
            };

            let ctx = context.clone();
            tokio::spawn(async move {
                if let Err(err) = process_job(ctx, queued).await {
                    error!(error = %err, "Background job processing failed");
                }
                drop(permit);
            });
        }

        receiver.close();
        let mut abandoned = 0usize;
        while let Ok(queued) = receiver.try_recv() {
            abandon_job(&context, queued).await;
            abandoned += 1;
        }

        warn!(abandoned, "Job worker pool exiting");
    })
}

/// Fail a job the pool will never dispatch.
async fn abandon_job(ctx: &JobWorkerContext, queued: QueuedScan) {
    let QueuedScan { mut job, .. } = queued;
    let job_id = job.job_id;
    match ctx.workflow.fail_job(&mut job, "Service shutting down").await {
        Ok(report) => finalize(ctx, job_id, &report).await,
        Err(e) => warn!(job_id = %job_id, error = %e, "Failed to record abandoned job"),
    }
    ctx.cancellations.remove(job_id).await;
}

/// Run one job from Pending to a terminal state.
pub async fn process_job(
    ctx: JobWorkerContext,
    queued: QueuedScan,
) -> Result<(), JobProcessingError> {
    let QueuedScan { mut job, cancel } = queued;
    let job_id = job.job_id;

    info!(job_id = %job_id, target = %job.target, "Processing scan job");

    // ── Workflow: Pending → Failed (cancelled while queued) ──────────
    if cancel.is_cancelled() {
        let outcome = ctx
            .workflow
            .fail_job(&mut job, "Cancelled before dispatch")
            .await;
        ctx.cancellations.remove(job_id).await;
        finalize(&ctx, job_id, &outcome?).await;
        return Ok(());
    }

    // ── Workflow: Pending → Running ──────────────────────────────────
    if let Err(e) = ctx.workflow.start_job(&mut job).await {
        error!(job_id = %job_id, error = %e, "Failed to transition job to Running");
        ctx.cancellations.remove(job_id).await;
        return Err(e.into());
    }

    // ── Execute adapters, recording progress as it arrives ───────────
    let plan = job.clone();
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let execution = ctx.coordinator.execute(&plan, cancel, progress_tx);
    tokio::pin!(execution);

    let results = loop {
        tokio::select! {
            results = &mut execution => break results,
            Some(progress) = progress_rx.recv() => {
                if let Err(e) = ctx.workflow.record_progress(&mut job, progress).await {
                    warn!(job_id = %job_id, error = %e, "Failed to record adapter progress");
                }
            }
        }
    };
    while let Ok(progress) = progress_rx.try_recv() {
        job.adapter_progress.insert(progress.scanner, progress.phase);
    }

    // ── Workflow: Running → Completed | PartiallyFailed | Failed ────
    let outcome = ctx.workflow.finish_job(&mut job, results).await;
    ctx.cancellations.remove(job_id).await;

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to finish job");
            return Err(e.into());
        }
    };
    finalize(&ctx, job_id, &report).await;

    Ok(())
}

async fn finalize(ctx: &JobWorkerContext, job_id: Uuid, report: &ScanReport) {
    if let Err(e) = ctx.artifacts.finalize(job_id, report).await {
        warn!(job_id = %job_id, error = %e, "Failed to finalize job artifacts");
    }
}

/// Errors surfaced while executing background jobs.
#[derive(thiserror::Error, Debug)]
pub enum JobProcessingError {
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}
