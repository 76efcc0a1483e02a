//! Error taxonomy shared by adapters, the coordinator and the API

use std::time::Duration;

use crate::domain::target::TargetError;

/// Every failure a scan can run into.
///
/// `Validation` is raised at submission time and aborts job creation.
/// `Execution`, `Timeout` and `Parse` are recorded per adapter and never
/// abort sibling adapters. `Internal` fails only the affected job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Could not parse tool output: {0}")]
    Parse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::Validation(_) => "VALIDATION_ERROR",
            ScanError::Execution(_) => "EXECUTION_ERROR",
            ScanError::Timeout(_) => "TIMEOUT_ERROR",
            ScanError::Parse(_) => "PARSE_ERROR",
            ScanError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<TargetError> for ScanError {
    fn from(err: TargetError) -> Self {
        ScanError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::Parse(err.to_string())
    }
}
