use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use scanhub_core::config::ScanConfig;

use super::snapshot::JobSnapshot;
use super::store::{JobStore, JobStoreError};

/// How long finished jobs stay in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub ttl: Duration,
    pub max_finished: usize,
}

impl RetentionPolicy {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            ttl: config.job_retention(),
            max_finished: config.max_retained_jobs,
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

/// Process-local job registry. Jobs do not survive a restart.
///
/// Finished jobs are evicted on save once they outlive the retention TTL,
/// or oldest first once more than `max_finished` are held. Pending and
/// running jobs are never evicted.
#[derive(Default)]
pub struct InMemoryJobStore {
    snapshots: RwLock<HashMap<Uuid, JobSnapshot>>,
    retention: RetentionPolicy,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            snapshots: RwLock::default(),
            retention,
        }
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn save_snapshot(&self, snapshot: JobSnapshot) -> Result<(), JobStoreError> {
        let job_id = snapshot.job_id();
        let status = snapshot.status();
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(job_id, snapshot);
        tracing::debug!(job_id = %job_id, status = %status, "Job snapshot saved");

        if status.is_terminal() {
            let evicted = evict_finished(&mut snapshots, &self.retention);
            if evicted > 0 {
                tracing::debug!(evicted, retained = snapshots.len(), "Evicted finished jobs");
            }
        }
        Ok(())
    }

    async fn get_snapshot(&self, job_id: Uuid) -> Result<Option<JobSnapshot>, JobStoreError> {
        Ok(self.snapshots.read().await.get(&job_id).cloned())
    }

    async fn delete_snapshot(&self, job_id: Uuid) -> Result<(), JobStoreError> {
        match self.snapshots.write().await.remove(&job_id) {
            Some(_) => {
                tracing::debug!(job_id = %job_id, "Job snapshot deleted");
                Ok(())
            }
            None => Err(JobStoreError::NotFound(job_id)),
        }
    }
}

fn evict_finished(
    snapshots: &mut HashMap<Uuid, JobSnapshot>,
    retention: &RetentionPolicy,
) -> usize {
    let before = snapshots.len();
    let now = Utc::now();
    snapshots.retain(|_, snapshot| {
        let expired = (now - snapshot.saved_at)
            .to_std()
            .is_ok_and(|age| age > retention.ttl);
        !(snapshot.status().is_terminal() && expired)
    });

    let mut finished: Vec<_> = snapshots
        .values()
        .filter(|snapshot| snapshot.status().is_terminal())
        .map(|snapshot| (snapshot.saved_at, snapshot.job_id()))
        .collect();
    if finished.len() > retention.max_finished {
        finished.sort_unstable();
        let excess = finished.len() - retention.max_finished;
        for (_, job_id) in finished.into_iter().take(excess) {
            snapshots.remove(&job_id);
        }
    }

    before - snapshots.len()
}
