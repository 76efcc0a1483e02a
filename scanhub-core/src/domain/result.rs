//! Per-adapter outcome recorded on a scan job

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::error::ScanError;
use crate::domain::finding::NormalizedFinding;

/// Number of trailing characters of stdout/stderr kept on a result.
pub const OUTPUT_TAIL_CHARS: usize = 2000;

/// Why an adapter failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdapterErrorKind {
    Validation,
    Execution,
    Parse,
    Internal,
    Cancelled,
}

/// Manifest entry describing how one adapter ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdapterStatus {
    Success {
        findings: usize,
    },
    Timeout {
        #[serde(rename = "afterSecs")]
        after_secs: u64,
    },
    Error {
        kind: AdapterErrorKind,
        message: String,
    },
}

impl AdapterStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, AdapterStatus::Success { .. })
    }
}

impl From<&ScanError> for AdapterStatus {
    fn from(err: &ScanError) -> Self {
        let kind = match err {
            ScanError::Timeout(after) => {
                return AdapterStatus::Timeout {
                    after_secs: after.as_secs(),
                };
            }
            ScanError::Validation(_) => AdapterErrorKind::Validation,
            ScanError::Execution(_) => AdapterErrorKind::Execution,
            ScanError::Parse(_) => AdapterErrorKind::Parse,
            ScanError::Internal(_) => AdapterErrorKind::Internal,
        };
        AdapterStatus::Error {
            kind,
            message: err.to_string(),
        }
    }
}

/// Result of running one adapter against a target.
///
/// A non-success result never carries findings: the constructors enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterResult {
    pub scanner: String,
    pub status: AdapterStatus,
    pub exit_code: Option<i32>,
    findings: Vec<NormalizedFinding>,
    /// Last characters of stdout, kept as a raw output reference
    pub stdout_tail: String,
    pub stderr_tail: String,
    /// Output hit the capture ceiling; parsing may be incomplete
    pub truncated: bool,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl AdapterResult {
    fn with_status(
        scanner: impl Into<String>,
        status: AdapterStatus,
        findings: Vec<NormalizedFinding>,
    ) -> Self {
        let now = Utc::now();
        Self {
            scanner: scanner.into(),
            status,
            exit_code: None,
            findings,
            stdout_tail: String::new(),
            stderr_tail: String::new(),
            truncated: false,
            duration_ms: 0,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn succeeded(scanner: impl Into<String>, findings: Vec<NormalizedFinding>) -> Self {
        let status = AdapterStatus::Success {
            findings: findings.len(),
        };
        Self::with_status(scanner, status, findings)
    }

    pub fn failed(scanner: impl Into<String>, error: &ScanError) -> Self {
        Self::with_status(scanner, AdapterStatus::from(error), Vec::new())
    }

    pub fn cancelled(scanner: impl Into<String>) -> Self {
        let status = AdapterStatus::Error {
            kind: AdapterErrorKind::Cancelled,
            message: "Scan cancelled".to_string(),
        };
        Self::with_status(scanner, status, Vec::new())
    }

    /// Attach the raw process facts.
    pub fn with_process_output(
        mut self,
        exit_code: Option<i32>,
        stdout: &str,
        stderr: &str,
        truncated: bool,
    ) -> Self {
        self.exit_code = exit_code;
        self.stdout_tail = tail(stdout, OUTPUT_TAIL_CHARS);
        self.stderr_tail = tail(stderr, OUTPUT_TAIL_CHARS);
        self.truncated = truncated;
        self
    }

    pub fn with_timing(mut self, started_at: DateTime<Utc>) -> Self {
        let finished_at = Utc::now();
        self.started_at = started_at;
        self.finished_at = finished_at;
        self.duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        self
    }

    pub fn findings(&self) -> &[NormalizedFinding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<NormalizedFinding> {
        self.findings
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Keep at most the last `max_chars` characters of `text`.
pub fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}
