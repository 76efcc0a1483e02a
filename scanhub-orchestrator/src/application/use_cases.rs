//! Application use cases

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use scanhub_core::domain::{
    NormalizedFinding, ScanError, ScanTarget, ScannerSelection, SeverityBreakdown,
    TargetPolicy, sort_by_severity,
};

use crate::application::workflow::{JobWorkflow, WorkflowError};
use crate::domain::{JobStatus, ReportSummary, ScanJob, ScanReport};
use crate::infrastructure::cancellation::CancellationRegistry;
use crate::infrastructure::job_queue::{JobQueueError, JobQueueHandle, QueuedScan};
use crate::infrastructure::job_store::JobSnapshot;
use crate::infrastructure::scanner_registry::ScannerRegistry;

/// Aggregate a job's adapter results into its report.
///
/// Findings are the union of every adapter's findings, severity-sorted and
/// never deduplicated. Every selected scanner appears in the manifest.
pub fn build_report(job: &ScanJob) -> ScanReport {
    let mut findings: Vec<NormalizedFinding> = job
        .adapter_results
        .iter()
        .flat_map(|result| result.findings().iter().cloned())
        .collect();
    sort_by_severity(&mut findings);

    let adapters = job
        .adapter_results
        .iter()
        .map(|result| (result.scanner.clone(), result.status.clone()))
        .collect::<BTreeMap<_, _>>();

    let adapters_succeeded = job
        .adapter_results
        .iter()
        .filter(|r| r.is_success())
        .count();

    let summary = ReportSummary {
        total_findings: findings.len(),
        by_severity: findings.iter().map(|f| &f.severity).collect::<SeverityBreakdown>(),
        adapters_succeeded,
        adapters_failed: job.adapter_results.len() - adapters_succeeded,
    };

    ScanReport {
        job_id: job.job_id,
        target: job.target.to_string(),
        status: job.status,
        findings,
        adapters,
        summary,
        completed_at: job.completed_at,
    }
}

/// Why a submission was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum SubmitScanError {
    #[error(transparent)]
    Rejected(#[from] ScanError),

    #[error(transparent)]
    Queue(#[from] JobQueueError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// Validate a scan request, create its job and put it on the queue.
pub struct SubmitScanUseCase {
    registry: Arc<ScannerRegistry>,
    policy: TargetPolicy,
    workflow: Arc<JobWorkflow>,
    queue: JobQueueHandle,
    cancellations: Arc<CancellationRegistry>,
}

impl SubmitScanUseCase {
    pub fn new(
        registry: Arc<ScannerRegistry>,
        policy: TargetPolicy,
        workflow: Arc<JobWorkflow>,
        queue: JobQueueHandle,
        cancellations: Arc<CancellationRegistry>,
    ) -> Self {
        Self {
            registry,
            policy,
            workflow,
            queue,
            cancellations,
        }
    }

    /// Nothing is spawned before the target and every selection validated.
    pub async fn execute(
        &self,
        raw_target: &str,
        selections: Vec<ScannerSelection>,
    ) -> Result<ScanJob, SubmitScanError> {
        let target = ScanTarget::parse(raw_target).map_err(ScanError::from)?;
        self.policy.check(&target).map_err(ScanError::from)?;
        self.registry.validate_selection(&target, &selections)?;

        let job = ScanJob::new(target, selections);
        let job_id = job.job_id;
        let cancel = self.cancellations.register(job_id).await;

        // Persist first: the worker may pick the job up before we return
        self.workflow.enqueue_job(&job).await?;

        if let Err(err) = self.queue.enqueue(QueuedScan {
            job: job.clone(),
            cancel,
        }) {
            warn!(job_id = %job_id, error = %err, "Job rejected by queue");
            self.cancellations.remove(job_id).await;
            if let Err(discard_err) = self.workflow.discard_job(job_id).await {
                warn!(job_id = %job_id, error = %discard_err, "Failed to discard rejected job");
            }
            return Err(err.into());
        }

        Ok(job)
    }
}

/// Read the latest snapshot of a job.
pub struct GetScanUseCase {
    workflow: Arc<JobWorkflow>,
}

impl GetScanUseCase {
    pub fn new(workflow: Arc<JobWorkflow>) -> Self {
        Self { workflow }
    }

    pub async fn execute(&self, job_id: Uuid) -> Result<Option<JobSnapshot>, WorkflowError> {
        self.workflow.get_job(job_id).await
    }
}

/// Outcome of a cancellation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelOutcome {
    pub job_id: Uuid,
    pub status: JobStatus,
    /// Whether a cancellation signal was delivered
    pub cancelled: bool,
}

/// Best-effort, idempotent job cancellation.
///
/// A queued job is failed by its worker before dispatch. A running job has its
/// subprocesses terminated and finishes through the normal aggregation rule.
/// Terminal jobs are left untouched.
pub struct CancelScanUseCase {
    workflow: Arc<JobWorkflow>,
    cancellations: Arc<CancellationRegistry>,
}

impl CancelScanUseCase {
    pub fn new(workflow: Arc<JobWorkflow>, cancellations: Arc<CancellationRegistry>) -> Self {
        Self {
            workflow,
            cancellations,
        }
    }

    /// `Ok(None)` for an unknown job.
    pub async fn execute(&self, job_id: Uuid) -> Result<Option<CancelOutcome>, WorkflowError> {
        let Some(snapshot) = self.workflow.get_job(job_id).await? else {
            return Ok(None);
        };

        let status = snapshot.status();
        let cancelled = if status.is_terminal() {
            false
        } else {
            self.cancellations.cancel(job_id).await
        };
        if cancelled {
            info!(job_id = %job_id, status = %status, "Cancellation requested");
        }

        Ok(Some(CancelOutcome {
            job_id,
            status,
            cancelled,
        }))
    }
}
