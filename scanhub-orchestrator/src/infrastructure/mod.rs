//! Orchestrator infrastructure: job registry, queue, scanner registry and
//! on-disk artifacts

pub mod artifacts;
pub mod cancellation;
pub mod job_queue;
pub mod job_store;
pub mod scanner_registry;

pub use artifacts::{ArtifactError, ArtifactStore};
pub use cancellation::CancellationRegistry;
pub use job_queue::{
    JobProcessingError, JobQueueError, JobQueueHandle, JobQueueReceiver, JobWorkerContext,
    QueuedScan, job_queue, spawn_job_worker_pool,
};
pub use job_store::{InMemoryJobStore, JobSnapshot, JobStore, JobStoreError, RetentionPolicy};
pub use scanner_registry::ScannerRegistry;
