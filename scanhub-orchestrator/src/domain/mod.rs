//! Orchestrator domain layer

pub mod entities;
pub mod value_objects;

pub use entities::{ReportSummary, ScanJob, ScanReport};
pub use value_objects::{
    AdapterPhase, AdapterProgress, JobStatus, JobTransition, JobTransitionError,
};
