//! Job Workflow: the single writer of scan job state.
//!
//! Every status transition goes through [`JobWorkflow`], which validates it
//! against the state machine on [`JobStatus`], records the audit-trail entry
//! on the [`ScanJob`] and persists a snapshot. Terminal snapshots carry the
//! aggregated report.
//!
//! ```text
//! SubmitScan         JobWorkflow          JobStore        Worker
//!     │                   │                   │              │
//!     ├─ enqueue_job() ──►│── save_snapshot ─►│              │
//!     │                   │                   │              │
//!     │                   │◄─ start_job() ────┼──────────────┤
//!     │                   │── save_snapshot ─►│              │
//!     │                   │◄─ record_progress ┼──────────────┤
//!     │                   │── save_snapshot ─►│              │
//!     │                   │◄─ finish_job() ───┼──────────────┤
//!     │                   │── save_snapshot ─►│  (+ report)  │
//! ```

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use scanhub_core::domain::AdapterResult;

use crate::application::use_cases::build_report;
use crate::domain::{AdapterProgress, JobStatus, JobTransitionError, ScanJob, ScanReport};
use crate::infrastructure::job_store::{JobSnapshot, JobStore, JobStoreError};

/// Errors from the workflow layer.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid state transition: {0}")]
    InvalidTransition(#[from] JobTransitionError),

    #[error("Persistence error: {0}")]
    Store(#[from] JobStoreError),
}

/// Centralised job lifecycle controller.
#[derive(Clone)]
pub struct JobWorkflow {
    job_store: Arc<dyn JobStore>,
}

impl JobWorkflow {
    pub fn new(job_store: Arc<dyn JobStore>) -> Self {
        Self { job_store }
    }

    // ── Transition helpers ───────────────────────────────────────────

    /// Persist the initial [`JobStatus::Pending`] snapshot of a new job.
    pub async fn enqueue_job(&self, job: &ScanJob) -> Result<(), WorkflowError> {
        self.persist(job, None).await?;
        info!(
            job_id = %job.job_id,
            target = %job.target,
            scanners = job.selections.len(),
            "Job accepted"
        );
        Ok(())
    }

    /// Transition a job to [`JobStatus::Running`] and persist.
    pub async fn start_job(&self, job: &mut ScanJob) -> Result<(), WorkflowError> {
        job.transition(JobStatus::Running, Some("Worker started execution".into()))?;
        self.persist(job, None).await?;
        info!(job_id = %job.job_id, "Job transitioned to Running");
        Ok(())
    }

    /// Record where one adapter is. No status transition.
    pub async fn record_progress(
        &self,
        job: &mut ScanJob,
        progress: AdapterProgress,
    ) -> Result<(), WorkflowError> {
        job.adapter_progress
            .insert(progress.scanner.clone(), progress.phase);
        self.persist(job, None).await?;
        tracing::debug!(
            job_id = %job.job_id,
            scanner = %progress.scanner,
            phase = ?progress.phase,
            "Adapter progress"
        );
        Ok(())
    }

    /// Store the adapter results, derive the terminal status and persist the
    /// aggregated report.
    ///
    /// All adapters succeeded: `Completed`. Some failed: `PartiallyFailed`.
    /// None succeeded: `Failed`.
    pub async fn finish_job(
        &self,
        job: &mut ScanJob,
        results: Vec<AdapterResult>,
    ) -> Result<ScanReport, WorkflowError> {
        let status = JobStatus::from_outcomes(results.iter().map(AdapterResult::is_success));
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let total = results.len();

        // Validate before touching the job so a rejected transition leaves it intact
        if !job.status.can_transition_to(status) {
            return Err(JobTransitionError {
                from: job.status,
                to: status,
            }
            .into());
        }
        job.adapter_results = results;
        if status == JobStatus::Failed {
            job.error = Some(format!("All {} scanners failed", total));
        }
        job.transition(
            status,
            Some(format!("{} of {} scanners succeeded", succeeded, total)),
        )?;

        let report = build_report(job);
        self.persist(job, Some(report.clone())).await?;

        if status == JobStatus::Completed {
            info!(
                job_id = %job.job_id,
                findings = report.summary.total_findings,
                "Job transitioned to Completed"
            );
        } else {
            warn!(
                job_id = %job.job_id,
                status = %status,
                findings = report.summary.total_findings,
                adapters_failed = report.summary.adapters_failed,
                "Job finished with adapter failures"
            );
        }
        Ok(report)
    }

    /// Transition a job to [`JobStatus::Failed`] with an error message and persist.
    pub async fn fail_job(
        &self,
        job: &mut ScanJob,
        reason: &str,
    ) -> Result<ScanReport, WorkflowError> {
        job.transition(JobStatus::Failed, Some(reason.to_string()))?;
        job.error = Some(reason.to_string());

        let report = build_report(job);
        self.persist(job, Some(report.clone())).await?;

        warn!(job_id = %job.job_id, error = %reason, "Job transitioned to Failed");
        Ok(report)
    }

    // ── Query helpers ────────────────────────────────────────────────

    /// Retrieve the latest snapshot of a job.
    pub async fn get_job(&self, job_id: Uuid) -> Result<Option<JobSnapshot>, WorkflowError> {
        Ok(self.job_store.get_snapshot(job_id).await?)
    }

    /// Drop a job that never made it onto the queue.
    pub async fn discard_job(&self, job_id: Uuid) -> Result<(), WorkflowError> {
        self.job_store.delete_snapshot(job_id).await?;
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn persist(
        &self,
        job: &ScanJob,
        report: Option<ScanReport>,
    ) -> Result<(), JobStoreError> {
        let snapshot = JobSnapshot::of(job);
        let snapshot = match report {
            Some(report) => snapshot.with_report(report),
            None => snapshot,
        };
        self.job_store.save_snapshot(snapshot).await
    }
}
