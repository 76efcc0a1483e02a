//! API request/response DTOs. JSON fields are camelCase on the wire.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use scanhub_core::domain::{
    FindingCategory, OutputFormat, ScannerDescriptor, ScannerSelection, TargetKind,
    ToolParameter,
};

use crate::domain::{AdapterPhase, JobStatus, JobTransition, ScanReport};
use crate::infrastructure::job_store::JobSnapshot;

/// Request body for `POST /scans`
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    /// Hostname, IP address, http(s) URL or absolute repository path
    #[schema(example = "example.com")]
    pub target: String,

    /// Scanners to run, by name or with parameters
    pub scanners: Vec<ScannerSelectionDto>,
}

/// A scanner chosen for a job: either its bare name or a name with parameters
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ScannerSelectionDto {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        parameters: Vec<ToolParameter>,
    },
}

impl From<ScannerSelectionDto> for ScannerSelection {
    fn from(dto: ScannerSelectionDto) -> Self {
        match dto {
            ScannerSelectionDto::Name(name) => ScannerSelection::new(name),
            ScannerSelectionDto::Detailed { name, parameters } => {
                ScannerSelection { name, parameters }
            }
        }
    }
}

/// Response for an accepted scan
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanAcceptedResponse {
    pub job_id: Uuid,

    #[schema(example = "Pending")]
    pub status: JobStatus,

    #[schema(example = "Scan job accepted.")]
    pub message: String,
}

/// Job status, adapter progress and, once terminal, the aggregated report
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatusResponse {
    pub job_id: Uuid,
    pub target: String,
    pub status: JobStatus,
    pub scanners: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-scanner phase
    pub progress: BTreeMap<String, AdapterPhase>,
    pub transitions: Vec<JobTransition>,
    /// Present only in a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ScanReport>,
}

impl From<JobSnapshot> for ScanStatusResponse {
    fn from(snapshot: JobSnapshot) -> Self {
        let JobSnapshot { job, report, .. } = snapshot;
        let report = report.filter(|_| job.status.is_terminal());
        Self {
            job_id: job.job_id,
            target: job.target.to_string(),
            status: job.status,
            scanners: job.scanner_names().map(str::to_string).collect(),
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            error: job.error,
            progress: job.adapter_progress,
            transitions: job.transitions,
            report,
        }
    }
}

/// Response for `DELETE /scans/{jobId}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    /// False when the job was already finished
    pub cancelled: bool,
}

/// A registered scanner
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScannerInfo {
    #[schema(example = "nuclei")]
    pub name: String,
    #[schema(example = "nuclei")]
    pub executable: String,
    pub output_format: OutputFormat,
    #[schema(example = 3600)]
    pub default_timeout_secs: u64,
    pub categories: Vec<FindingCategory>,
    /// Empty when the scanner ignores the target
    pub target_kinds: Vec<TargetKind>,
    pub description: String,
    pub required_parameters: Vec<String>,
}

impl From<&ScannerDescriptor> for ScannerInfo {
    fn from(descriptor: &ScannerDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            executable: descriptor.executable.clone(),
            output_format: descriptor.output_format,
            default_timeout_secs: descriptor.default_timeout.as_secs(),
            categories: descriptor.categories.clone(),
            target_kinds: descriptor.target_kinds.clone(),
            description: descriptor.description.clone(),
            required_parameters: descriptor.required_parameters.clone(),
        }
    }
}

/// Response for `GET /scanners`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScannerListResponse {
    pub scanners: Vec<ScannerInfo>,
    pub total: usize,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Machine-readable error code
    #[schema(example = "VALIDATION_ERROR")]
    pub code: String,

    /// Human-readable error message
    #[schema(example = "Unknown scanner 'masscan'")]
    pub message: String,

    /// Additional error context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Unique request identifier for tracking and support
    pub request_id: Uuid,

    /// Error occurrence timestamp
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub timestamp: DateTime<Utc>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall service health status
    #[schema(example = "healthy")]
    pub status: String,

    /// Current service version
    #[schema(example = "0.3.0")]
    pub version: String,

    /// Health check timestamp
    pub timestamp: DateTime<Utc>,

    /// Scanners registered and jobs waiting for a worker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
