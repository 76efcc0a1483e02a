//! Scan Job Coordinator
//!
//! Runs every selected adapter of one job on its own task, at most
//! `max_concurrent_adapters` at a time. Each adapter carries its own timeout
//! and its failure never touches its siblings. Results are handed back only
//! once every dispatched adapter has returned.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span};

use scanhub_adapters::{AdapterContext, ToolAdapter};
use scanhub_core::config::ScanConfig;
use scanhub_core::domain::{AdapterResult, ScanError, ScannerSelection};
use scanhub_runner::ProcessRunner;

use crate::domain::{AdapterPhase, AdapterProgress, ScanJob};
use crate::infrastructure::artifacts::ArtifactStore;
use crate::infrastructure::scanner_registry::ScannerRegistry;

/// Receives adapter phase changes while a job runs.
pub type ProgressSender = mpsc::UnboundedSender<AdapterProgress>;

/// Execution limits applied to every job.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub max_concurrent_adapters: usize,
    pub clone_timeout: Duration,
    pub keep_artifacts: bool,
}

impl From<&ScanConfig> for CoordinatorSettings {
    fn from(config: &ScanConfig) -> Self {
        Self {
            max_concurrent_adapters: config.max_concurrent_adapters,
            clone_timeout: config.clone_timeout(),
            keep_artifacts: config.keep_artifacts,
        }
    }
}

pub struct ScanCoordinator {
    registry: Arc<ScannerRegistry>,
    runner: ProcessRunner,
    artifacts: ArtifactStore,
    settings: CoordinatorSettings,
}

impl ScanCoordinator {
    pub fn new(
        registry: Arc<ScannerRegistry>,
        runner: ProcessRunner,
        artifacts: ArtifactStore,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            registry,
            runner,
            artifacts,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<ScannerRegistry> {
        &self.registry
    }

    /// Run every selected adapter and return their results in selection order.
    ///
    /// Never fails: an unregistered scanner or a panicking adapter task is
    /// recorded as an internal-error result for that scanner only.
    pub async fn execute(
        &self,
        job: &ScanJob,
        cancel: CancellationToken,
        progress: ProgressSender,
    ) -> Vec<AdapterResult> {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_adapters.max(1)));
        let mut handles = Vec::with_capacity(job.selections.len());

        info!(
            job_id = %job.job_id,
            scanners = job.selections.len(),
            max_concurrent = self.settings.max_concurrent_adapters,
            "Dispatching adapters"
        );

        for selection in &job.selections {
            let Some(adapter) = self.registry.get(&selection.name) else {
                // Registry lookups were validated at submission
                let err = ScanError::internal(format!(
                    "Scanner '{}' is not registered",
                    selection.name
                ));
                error!(job_id = %job.job_id, scanner = %selection.name, error = %err, "Adapter unavailable");
                let _ = progress.send(AdapterProgress::new(&selection.name, AdapterPhase::Failed));
                handles.push((selection.name.clone(), Err(err)));
                continue;
            };

            let ctx = self.context(job, selection, adapter.as_ref(), cancel.clone());
            let handle = tokio::spawn(
                run_one(
                    adapter,
                    self.runner.clone(),
                    ctx,
                    semaphore.clone(),
                    progress.clone(),
                )
                .instrument(info_span!("adapter", job_id = %job.job_id, scanner = %selection.name)),
            );
            handles.push((selection.name.clone(), Ok(handle)));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (scanner, handle) in handles {
            let result = match handle {
                Err(err) => AdapterResult::failed(&scanner, &err),
                Ok(handle) => match handle.await {
                    Ok(result) => result,
                    Err(join_err) => {
                        error!(
                            job_id = %job.job_id,
                            scanner = %scanner,
                            error = %join_err,
                            "Adapter task aborted"
                        );
                        let _ = progress.send(AdapterProgress::new(&scanner, AdapterPhase::Failed));
                        let reason = if join_err.is_panic() {
                            "Adapter panicked"
                        } else {
                            "Adapter task was aborted"
                        };
                        AdapterResult::failed(&scanner, &ScanError::internal(reason))
                    }
                },
            };
            results.push(result);
        }
        results
    }

    fn context(
        &self,
        job: &ScanJob,
        selection: &ScannerSelection,
        adapter: &dyn ToolAdapter,
        cancel: CancellationToken,
    ) -> AdapterContext {
        AdapterContext {
            job_id: job.job_id,
            target: job.target.clone(),
            parameters: selection.parameters.clone(),
            work_dir: self.work_dir(job, &selection.name),
            timeout: adapter.descriptor().default_timeout,
            clone_timeout: self.settings.clone_timeout,
            cancel,
            keep_artifacts: self.settings.keep_artifacts,
        }
    }

    fn work_dir(&self, job: &ScanJob, scanner: &str) -> PathBuf {
        self.artifacts.scanner_dir(job.job_id, scanner)
    }
}

async fn run_one(
    adapter: Arc<dyn ToolAdapter>,
    runner: ProcessRunner,
    ctx: AdapterContext,
    semaphore: Arc<Semaphore>,
    progress: ProgressSender,
) -> AdapterResult {
    let scanner = adapter.name().to_string();
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(err) => {
            let _ = progress.send(AdapterProgress::new(&scanner, AdapterPhase::Failed));
            return AdapterResult::failed(&scanner, &ScanError::internal(err.to_string()));
        }
    };

    let _ = progress.send(AdapterProgress::new(&scanner, AdapterPhase::Running));
    let result = adapter.run(&runner, &ctx).await;
    let phase = if result.is_success() {
        AdapterPhase::Completed
    } else {
        AdapterPhase::Failed
    };
    let _ = progress.send(AdapterProgress::new(&scanner, phase));
    result
}
