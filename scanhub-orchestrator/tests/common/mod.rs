//! Shared test doubles and a fully wired orchestrator for integration tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use scanhub_adapters::adapter::base_command;
use scanhub_adapters::{AdapterContext, Invocation, PreparedSource, ToolAdapter, ToolOutput};
use scanhub_core::Config;
use scanhub_core::domain::{
    AdapterResult, FindingCategory, NormalizedFinding, OutputFormat, ScanError, ScannerDescriptor,
    Severity, TargetKind, TargetPolicy,
};
use scanhub_orchestrator::application::{
    CancelScanUseCase, CoordinatorSettings, GetScanUseCase, JobWorkflow, ScanCoordinator,
    SubmitScanUseCase,
};
use scanhub_orchestrator::infrastructure::{
    ArtifactStore, CancellationRegistry, InMemoryJobStore, JobQueueHandle, JobQueueReceiver,
    JobWorkerContext,
    ScannerRegistry, job_queue, spawn_job_worker_pool,
};
use scanhub_orchestrator::presentation::{OrchestratorState, create_router};
use scanhub_runner::{ProcessRunner, RunnerConfig};

// ── Canned adapter ───────────────────────────────────────────────────────────

/// Returns a fixed outcome after an optional delay without spawning anything.
/// Cancellation during the delay yields a cancelled result.
pub struct CannedAdapter {
    descriptor: ScannerDescriptor,
    findings: Vec<NormalizedFinding>,
    failure: Option<ScanError>,
    delay: Duration,
}

impl CannedAdapter {
    pub fn new(name: &str) -> Self {
        Self {
            descriptor: ScannerDescriptor::new(name, name)
                .with_output_format(OutputFormat::Structured)
                .with_target_kinds(&[TargetKind::Hostname, TargetKind::Ip, TargetKind::Url]),
            findings: Vec::new(),
            failure: None,
            delay: Duration::ZERO,
        }
    }

    pub fn with_findings(mut self, severities: &[Severity]) -> Self {
        let name = self.descriptor.name.clone();
        self.findings = severities
            .iter()
            .enumerate()
            .map(|(i, severity)| {
                NormalizedFinding::builder(
                    &name,
                    FindingCategory::Vulnerability,
                    format!("{} finding {}", name, i + 1),
                )
                .severity(*severity)
                .build()
            })
            .collect();
        self
    }

    pub fn failing(mut self, error: ScanError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn required(mut self, names: &[&str]) -> Self {
        self.descriptor = self.descriptor.with_required_parameters(names);
        self
    }

    pub fn arc(self) -> Arc<dyn ToolAdapter> {
        Arc::new(self)
    }
}

#[async_trait]
impl ToolAdapter for CannedAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn build_invocation(
        &self,
        _ctx: &AdapterContext,
        _source: &PreparedSource,
    ) -> Result<Invocation, ScanError> {
        Err(ScanError::internal("canned adapter never spawns"))
    }

    fn parse_output(&self, _output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        Ok(self.findings.clone())
    }

    async fn run(&self, _runner: &ProcessRunner, ctx: &AdapterContext) -> AdapterResult {
        if !self.delay.is_zero() {
            tokio::select! {
                _ = ctx.cancel.cancelled() => return AdapterResult::cancelled(self.name()),
                _ = tokio::time::sleep(self.delay) => {}
            }
        }
        match &self.failure {
            Some(err) => AdapterResult::failed(self.name(), err),
            None => AdapterResult::succeeded(self.name(), self.findings.clone()),
        }
    }
}

// ── Panicking adapter ────────────────────────────────────────────────────────

pub struct PanickingAdapter {
    descriptor: ScannerDescriptor,
}

impl PanickingAdapter {
    pub fn arc(name: &str) -> Arc<dyn ToolAdapter> {
        Arc::new(Self {
            descriptor: ScannerDescriptor::new(name, name),
        })
    }
}

#[async_trait]
impl ToolAdapter for PanickingAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn build_invocation(
        &self,
        _ctx: &AdapterContext,
        _source: &PreparedSource,
    ) -> Result<Invocation, ScanError> {
        Err(ScanError::internal("unused"))
    }

    fn parse_output(&self, _output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        Ok(Vec::new())
    }

    async fn run(&self, _runner: &ProcessRunner, _ctx: &AdapterContext) -> AdapterResult {
        panic!("scanner blew up");
    }
}

// ── Shell adapter ────────────────────────────────────────────────────────────

/// Runs `sh -c <script>` through the real process runner. Each stdout line
/// becomes a low-severity finding.
pub struct ShellAdapter {
    descriptor: ScannerDescriptor,
}

impl ShellAdapter {
    pub fn arc(name: &str, script: &str, timeout: Duration) -> Arc<dyn ToolAdapter> {
        Arc::new(Self {
            descriptor: ScannerDescriptor::new(name, "sh")
                .with_arguments(["-c", script])
                .with_timeout(timeout),
        })
    }
}

#[async_trait]
impl ToolAdapter for ShellAdapter {
    fn descriptor(&self) -> &ScannerDescriptor {
        &self.descriptor
    }

    fn build_invocation(
        &self,
        _ctx: &AdapterContext,
        _source: &PreparedSource,
    ) -> Result<Invocation, ScanError> {
        Ok(Invocation::new(base_command(&self.descriptor)))
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError> {
        Ok(output
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                NormalizedFinding::builder(self.name(), FindingCategory::Exposure, line.trim())
                    .severity(Severity::Low)
                    .build()
            })
            .collect())
    }
}

// ── Wiring ───────────────────────────────────────────────────────────────────

pub fn runner() -> ProcessRunner {
    ProcessRunner::new(RunnerConfig {
        max_output_bytes: 64 * 1024,
        kill_grace: Duration::from_millis(100),
    })
}

pub fn coordinator(
    adapters: Vec<Arc<dyn ToolAdapter>>,
    work_dir: &Path,
    max_concurrent_adapters: usize,
) -> ScanCoordinator {
    ScanCoordinator::new(
        Arc::new(ScannerRegistry::from_adapters(adapters)),
        runner(),
        ArtifactStore::new(work_dir, false),
        CoordinatorSettings {
            max_concurrent_adapters,
            clone_timeout: Duration::from_secs(5),
            keep_artifacts: false,
        },
    )
}

/// The whole orchestrator with in-memory storage and a running worker pool.
pub struct TestApp {
    pub router: Router,
    pub state: OrchestratorState,
    pub store: Arc<InMemoryJobStore>,
    pub workflow: Arc<JobWorkflow>,
    pub cancellations: Arc<CancellationRegistry>,
    pub queue: JobQueueHandle,
    pub shutdown: CancellationToken,
    pub workers: Option<JoinHandle<()>>,
    /// Held open when no workers consume the queue
    idle_receiver: Option<JobQueueReceiver>,
}

impl TestApp {
    pub fn new(adapters: Vec<Arc<dyn ToolAdapter>>, work_dir: &Path) -> Self {
        Self::build(adapters, work_dir, 16, true)
    }

    /// No worker pool: submitted jobs stay queued.
    pub fn without_workers(
        adapters: Vec<Arc<dyn ToolAdapter>>,
        work_dir: &Path,
        capacity: usize,
    ) -> Self {
        Self::build(adapters, work_dir, capacity, false)
    }

    fn build(
        adapters: Vec<Arc<dyn ToolAdapter>>,
        work_dir: &Path,
        capacity: usize,
        start_workers: bool,
    ) -> Self {
        let registry = Arc::new(ScannerRegistry::from_adapters(adapters));
        let store = Arc::new(InMemoryJobStore::new());
        let workflow = Arc::new(JobWorkflow::new(store.clone()));
        let cancellations = Arc::new(CancellationRegistry::new());
        let artifacts = ArtifactStore::new(work_dir, false);
        let (queue, receiver) = job_queue(capacity);

        let coordinator = Arc::new(ScanCoordinator::new(
            registry.clone(),
            runner(),
            artifacts.clone(),
            CoordinatorSettings {
                max_concurrent_adapters: 4,
                clone_timeout: Duration::from_secs(5),
                keep_artifacts: false,
            },
        ));

        let shutdown = CancellationToken::new();
        let (workers, idle_receiver) = if start_workers {
            let pool = spawn_job_worker_pool(
                JobWorkerContext {
                    workflow: workflow.clone(),
                    coordinator,
                    cancellations: cancellations.clone(),
                    artifacts,
                },
                receiver,
                2,
                shutdown.clone(),
            );
            (Some(pool), None)
        } else {
            (None, Some(receiver))
        };

        let state = OrchestratorState {
            submit_scan_use_case: Arc::new(SubmitScanUseCase::new(
                registry.clone(),
                TargetPolicy::allow_all(),
                workflow.clone(),
                queue.clone(),
                cancellations.clone(),
            )),
            get_scan_use_case: Arc::new(GetScanUseCase::new(workflow.clone())),
            cancel_scan_use_case: Arc::new(CancelScanUseCase::new(
                workflow.clone(),
                cancellations.clone(),
            )),
            registry,
            queue: queue.clone(),
        };
        let router = create_router(state.clone(), &Config::default());

        Self {
            router,
            state,
            store,
            workflow,
            cancellations,
            queue,
            shutdown,
            workers,
            idle_receiver,
        }
    }
}

/// Poll until the job reaches a terminal state.
pub async fn wait_for_terminal(
    workflow: &JobWorkflow,
    job_id: uuid::Uuid,
) -> scanhub_orchestrator::infrastructure::JobSnapshot {
    for _ in 0..200 {
        if let Some(snapshot) = workflow.get_job(job_id).await.unwrap() {
            if snapshot.status().is_terminal() {
                return snapshot;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {} did not finish in time", job_id);
}
