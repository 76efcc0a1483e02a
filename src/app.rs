//! Application setup and wiring

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use scanhub_adapters::default_catalog;
use scanhub_core::Config;
use scanhub_core::domain::TargetPolicy;
use scanhub_orchestrator::application::{
    CancelScanUseCase, CoordinatorSettings, GetScanUseCase, JobWorkflow, ScanCoordinator,
    SubmitScanUseCase,
};
use scanhub_orchestrator::infrastructure::{
    ArtifactStore, CancellationRegistry, InMemoryJobStore, JobStore, JobWorkerContext,
    RetentionPolicy, ScannerRegistry, job_queue, spawn_job_worker_pool,
};
use scanhub_orchestrator::presentation::{OrchestratorState, create_router};
use scanhub_runner::{ProcessRunner, RunnerConfig};

/// Handle returned from create_app for graceful shutdown coordination
pub struct AppHandle {
    pub router: Router,
    /// Stops the worker pool from taking new jobs
    pub shutdown_token: CancellationToken,
    /// Live jobs, cancelled on shutdown
    pub cancellations: Arc<CancellationRegistry>,
    pub workers: JoinHandle<()>,
}

impl AppHandle {
    /// Stop taking jobs and cancel every job still in flight.
    pub async fn shutdown(&self) -> usize {
        self.shutdown_token.cancel();
        self.cancellations.cancel_all().await
    }
}

/// Build every component and start the worker pool.
pub async fn create_app(
    config: Config,
) -> Result<AppHandle, Box<dyn std::error::Error + Send + Sync>> {
    let startup_time = Instant::now();
    let shutdown_token = CancellationToken::new();

    // Scanner catalog
    let registry = Arc::new(ScannerRegistry::from_adapters(default_catalog(&config)));
    if registry.is_empty() {
        tracing::warn!("Every bundled scanner is disabled; all submissions will be rejected");
    }
    tracing::info!(scanners = ?registry.names(), "Scanner registry initialized");

    let policy = TargetPolicy::new(config.scan.allowed_target_patterns.as_slice())?;

    // Job state
    let job_store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::with_retention(
        RetentionPolicy::from_config(&config.scan),
    ));
    let workflow = Arc::new(JobWorkflow::new(job_store));
    let cancellations = Arc::new(CancellationRegistry::new());
    let artifacts = ArtifactStore::new(&config.scan.work_dir, config.scan.keep_artifacts);

    let runner = ProcessRunner::new(RunnerConfig {
        max_output_bytes: config.scan.max_output_bytes,
        kill_grace: config.scan.kill_grace(),
    });
    let coordinator = Arc::new(ScanCoordinator::new(
        registry.clone(),
        runner,
        artifacts.clone(),
        CoordinatorSettings::from(&config.scan),
    ));

    // Initialize background job queue and worker pool
    let (queue, receiver) = job_queue(config.scan.job_queue_capacity);
    let workers = spawn_job_worker_pool(
        JobWorkerContext {
            workflow: workflow.clone(),
            coordinator,
            cancellations: cancellations.clone(),
            artifacts,
        },
        receiver,
        config.scan.max_job_workers,
        shutdown_token.clone(),
    );

    let orchestrator_state = OrchestratorState {
        submit_scan_use_case: Arc::new(SubmitScanUseCase::new(
            registry.clone(),
            policy,
            workflow.clone(),
            queue.clone(),
            cancellations.clone(),
        )),
        get_scan_use_case: Arc::new(GetScanUseCase::new(workflow.clone())),
        cancel_scan_use_case: Arc::new(CancelScanUseCase::new(workflow, cancellations.clone())),
        registry,
        queue,
    };

    let router = create_router(orchestrator_state, &config);

    tracing::info!(
        elapsed_ms = startup_time.elapsed().as_millis() as u64,
        work_dir = %config.scan.work_dir.display(),
        "Application initialized"
    );

    Ok(AppHandle {
        router,
        shutdown_token,
        cancellations,
        workers,
    })
}
