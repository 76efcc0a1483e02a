//! Orchestrator API controllers

pub mod health;
pub mod scanners;
pub mod scans;

use std::sync::Arc;

use crate::application::use_cases::{CancelScanUseCase, GetScanUseCase, SubmitScanUseCase};
use crate::infrastructure::job_queue::JobQueueHandle;
use crate::infrastructure::scanner_registry::ScannerRegistry;

/// Application state shared by every handler
#[derive(Clone)]
pub struct OrchestratorState {
    pub submit_scan_use_case: Arc<SubmitScanUseCase>,
    pub get_scan_use_case: Arc<GetScanUseCase>,
    pub cancel_scan_use_case: Arc<CancelScanUseCase>,
    pub registry: Arc<ScannerRegistry>,
    pub queue: JobQueueHandle,
}
