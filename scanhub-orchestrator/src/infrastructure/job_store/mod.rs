//! Job registry: job id to latest job snapshot

mod memory;
mod snapshot;
mod store;

pub use memory::{InMemoryJobStore, RetentionPolicy};
pub use snapshot::JobSnapshot;
pub use store::{JobStore, JobStoreError};
