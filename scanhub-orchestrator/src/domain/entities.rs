//! Orchestrator domain entities

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use scanhub_core::domain::{
    AdapterResult, AdapterStatus, NormalizedFinding, ScanTarget, ScannerSelection,
    SeverityBreakdown,
};

use super::value_objects::{
    AdapterPhase, JobStatus, JobTransition, JobTransitionError,
};

/// One orchestrated scan run against one target.
///
/// The worker processing the job holds the only mutable copy; everyone else
/// reads snapshots from the job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanJob {
    pub job_id: Uuid,
    pub target: ScanTarget,
    pub selections: Vec<ScannerSelection>,
    pub status: JobStatus,
    /// In selection order, filled once every adapter has returned
    pub adapter_results: Vec<AdapterResult>,
    pub adapter_progress: BTreeMap<String, AdapterPhase>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    #[serde(default)]
    pub transitions: Vec<JobTransition>,
}

impl ScanJob {
    pub fn new(target: ScanTarget, selections: Vec<ScannerSelection>) -> Self {
        let adapter_progress = selections
            .iter()
            .map(|s| (s.name.clone(), AdapterPhase::Queued))
            .collect();
        Self {
            job_id: Uuid::new_v4(),
            target,
            selections,
            status: JobStatus::Pending,
            adapter_results: Vec::new(),
            adapter_progress,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
            transitions: Vec::new(),
        }
    }

    /// Move to `to`, stamping the lifecycle timestamps and recording the
    /// transition. Terminal states never change again.
    pub fn transition(
        &mut self,
        to: JobStatus,
        reason: Option<String>,
    ) -> Result<(), JobTransitionError> {
        let from = self.status;
        if !from.can_transition_to(to) {
            return Err(JobTransitionError { from, to });
        }

        let now = Utc::now();
        if to == JobStatus::Running {
            self.started_at = Some(now);
        }
        if to.is_terminal() {
            self.completed_at = Some(now);
        }
        self.status = to;
        self.transitions.push(JobTransition {
            from,
            to,
            timestamp: now,
            reason,
        });
        Ok(())
    }

    pub fn scanner_names(&self) -> impl Iterator<Item = &str> {
        self.selections.iter().map(|s| s.name.as_str())
    }
}

/// Report summary statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_findings: usize,
    pub by_severity: SeverityBreakdown,
    pub adapters_succeeded: usize,
    pub adapters_failed: usize,
}

/// Aggregated result of a finished job: every adapter's findings plus a
/// manifest of how each adapter ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub job_id: Uuid,
    pub target: String,
    pub status: JobStatus,
    /// Critical first; equal severities keep adapter order
    pub findings: Vec<NormalizedFinding>,
    /// Per-adapter outcome keyed by scanner name
    pub adapters: BTreeMap<String, AdapterStatus>,
    pub summary: ReportSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
