use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{JobStatus, ScanJob, ScanReport};

/// Point-in-time copy of a job as last persisted by its worker.
///
/// `report` is present once the job reached a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    #[serde(flatten)]
    pub job: ScanJob,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ScanReport>,
    pub saved_at: DateTime<Utc>,
}

impl JobSnapshot {
    pub fn of(job: &ScanJob) -> Self {
        Self {
            job: job.clone(),
            report: None,
            saved_at: Utc::now(),
        }
    }

    pub fn with_report(mut self, report: ScanReport) -> Self {
        self.report = Some(report);
        self
    }

    pub fn job_id(&self) -> Uuid {
        self.job.job_id
    }

    pub fn status(&self) -> JobStatus {
        self.job.status
    }
}
