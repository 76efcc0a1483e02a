//! ScanHub - security scanner orchestration service
//!
//! This is the main binary crate that wires the scanner catalog, the job
//! worker pool and the HTTP API together.

mod app;

pub use app::{AppHandle, create_app};
pub use scanhub_core::{Config, init_tracing};
pub use scanhub_orchestrator::presentation::controllers::OrchestratorState;

// Re-export for convenience
pub use scanhub_adapters;
pub use scanhub_core;
pub use scanhub_orchestrator;
pub use scanhub_runner;
