use async_trait::async_trait;
use uuid::Uuid;

use super::snapshot::JobSnapshot;

/// Job persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),
}

/// Job storage interface.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn save_snapshot(&self, snapshot: JobSnapshot) -> Result<(), JobStoreError>;
    async fn get_snapshot(&self, job_id: Uuid) -> Result<Option<JobSnapshot>, JobStoreError>;
    async fn delete_snapshot(&self, job_id: Uuid) -> Result<(), JobStoreError>;
}
