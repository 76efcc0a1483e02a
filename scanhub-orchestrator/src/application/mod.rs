//! Orchestrator application layer

pub mod coordinator;
pub mod use_cases;
pub mod workflow;

pub use coordinator::{CoordinatorSettings, ProgressSender, ScanCoordinator};
pub use use_cases::{
    CancelOutcome, CancelScanUseCase, GetScanUseCase, SubmitScanError, SubmitScanUseCase,
    build_report,
};
pub use workflow::{JobWorkflow, WorkflowError};
