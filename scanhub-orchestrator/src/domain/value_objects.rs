//! Orchestrator value objects

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle state of a scan job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum JobStatus {
    /// Created and queued, no adapter dispatched yet
    Pending,
    /// Adapters dispatched
    Running,
    /// Every adapter succeeded
    Completed,
    /// At least one adapter failed and at least one succeeded
    PartiallyFailed,
    /// Every adapter failed, or the job never reached dispatch
    Failed,
}

impl JobStatus {
    /// Returns the set of valid target states from the current state.
    ///
    /// ```text
    /// Pending ──► Running ──► Completed
    ///   │           ├──────► PartiallyFailed
    ///   │           └──────► Failed
    ///   └───────────────────► Failed
    /// ```
    pub fn valid_transitions(&self) -> &'static [JobStatus] {
        match self {
            Self::Pending => &[Self::Running, Self::Failed],
            Self::Running => &[Self::Completed, Self::PartiallyFailed, Self::Failed],
            Self::Completed | Self::PartiallyFailed | Self::Failed => &[],
        }
    }

    /// Check whether transitioning to `target` is allowed from the current state.
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        self.valid_transitions().contains(&target)
    }

    /// Whether this status represents a terminal (final) state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PartiallyFailed | Self::Failed
        )
    }

    /// Terminal status for a finished set of adapter outcomes, given as
    /// per-adapter success flags.
    ///
    /// No outcomes at all counts as failure: nothing was scanned.
    pub fn from_outcomes<I>(outcomes: I) -> JobStatus
    where
        I: IntoIterator<Item = bool>,
    {
        let (mut succeeded, mut failed) = (0usize, 0usize);
        for success in outcomes {
            if success {
                succeeded += 1;
            } else {
                failed += 1;
            }
        }
        match (succeeded, failed) {
            (0, _) => JobStatus::Failed,
            (_, 0) => JobStatus::Completed,
            _ => JobStatus::PartiallyFailed,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Running => write!(f, "Running"),
            Self::Completed => write!(f, "Completed"),
            Self::PartiallyFailed => write!(f, "PartiallyFailed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Recorded state transition for a scan job (audit trail).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobTransition {
    pub from: JobStatus,
    pub to: JobStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Human-readable reason or context for the transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an invalid status transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid job transition from {from} to {to}")]
pub struct JobTransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Where a single adapter of a running job currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdapterPhase {
    Queued,
    Running,
    Completed,
    Failed,
}

/// Progress event emitted by the coordinator for one adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProgress {
    pub scanner: String,
    pub phase: AdapterPhase,
}

impl AdapterProgress {
    pub fn new(scanner: impl Into<String>, phase: AdapterPhase) -> Self {
        Self {
            scanner: scanner.into(),
            phase,
        }
    }
}
