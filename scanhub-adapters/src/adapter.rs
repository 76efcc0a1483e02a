//! Adapter contract and the shared execution path

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use scanhub_core::domain::result::tail;
use scanhub_core::domain::{
    AdapterResult, NormalizedFinding, ScanError, ScanTarget, ScannerDescriptor, ToolParameter,
};
use scanhub_runner::{CommandSpec, ProcessRunner, RunnerError, read_capped};

use crate::params::ParameterRenderer;

/// Everything an adapter needs to run once for one job.
#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub job_id: Uuid,
    pub target: ScanTarget,
    pub parameters: Vec<ToolParameter>,
    /// Private directory for this adapter, `<work_dir>/<job_id>/<scanner>`
    pub work_dir: PathBuf,
    pub timeout: Duration,
    pub clone_timeout: Duration,
    pub cancel: CancellationToken,
    /// Write `output.stdout` / `output.stderr` next to the tool's own files
    pub keep_artifacts: bool,
}

impl AdapterContext {
    pub fn parameter(&self, flag: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.flag == flag)
    }

    pub fn work_file(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }
}

/// Input resolved before the tool runs, e.g. a cloned repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedSource {
    pub path: Option<PathBuf>,
}

impl PreparedSource {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// The source directory as an argv element.
    pub fn path_arg(&self) -> Result<String, ScanError> {
        self.path
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .ok_or_else(|| ScanError::internal("No source directory was prepared"))
    }
}

/// The command to run and, for tools that write one, where the report lands.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: CommandSpec,
    pub report_path: Option<PathBuf>,
}

impl Invocation {
    pub fn new(command: CommandSpec) -> Self {
        Self {
            command,
            report_path: None,
        }
    }

    pub fn with_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }
}

/// What a finished tool produced.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// Contents of the report file, when the tool writes one
    pub report: Option<String>,
    pub exit_code: Option<i32>,
    /// Stdout hit the capture limit
    pub stdout_truncated: bool,
    /// The report file hit the capture limit
    pub report_truncated: bool,
    /// Any captured stream was cut short
    pub truncated: bool,
    /// Directory the tool scanned, used to relativize reported paths
    pub source_root: Option<PathBuf>,
}

impl ToolOutput {
    /// Report contents; empty when the tool wrote no report.
    pub fn report_text(&self) -> &str {
        self.report.as_deref().unwrap_or_default()
    }

    /// Report contents, or an execution error when the tool exited without
    /// writing one.
    pub fn require_report(&self, scanner: &str) -> Result<&str, ScanError> {
        match &self.report {
            Some(report) => Ok(report),
            None => Err(with_stderr(format!("{} wrote no report", scanner), self)),
        }
    }

    /// Strip the scanned directory from a path reported by the tool.
    pub fn relative_path(&self, path: &str) -> String {
        self.source_root
            .as_deref()
            .and_then(|root| Path::new(path).strip_prefix(root).ok())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string())
    }
}

/// Contract every scanner integration implements.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    fn descriptor(&self) -> &ScannerDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// How request parameters map onto argv for this tool.
    fn parameters(&self) -> ParameterRenderer {
        ParameterRenderer::new()
    }

    /// Checked at submission, before any process exists.
    fn validate(&self, target: &ScanTarget, parameters: &[ToolParameter]) -> Result<(), ScanError> {
        let descriptor = self.descriptor();
        if !descriptor.accepts_target(target.kind()) {
            return Err(ScanError::validation(format!(
                "{} cannot scan a {} target",
                descriptor.name,
                target.kind()
            )));
        }
        for required in &descriptor.required_parameters {
            let present = parameters
                .iter()
                .any(|p| &p.flag == required && p.values().iter().any(|v| !v.trim().is_empty()));
            if !present {
                return Err(ScanError::validation(format!(
                    "{} requires the '{}' parameter",
                    descriptor.name, required
                )));
            }
        }
        self.parameters().validate(parameters)
    }

    /// Resolve inputs the command needs. Most tools need none.
    async fn prepare(
        &self,
        _runner: &ProcessRunner,
        _ctx: &AdapterContext,
    ) -> Result<PreparedSource, ScanError> {
        Ok(PreparedSource::default())
    }

    fn build_invocation(
        &self,
        ctx: &AdapterContext,
        source: &PreparedSource,
    ) -> Result<Invocation, ScanError>;

    /// Whether the exit status leaves the output worth parsing.
    fn accepts_exit(&self, output: &ToolOutput) -> bool {
        output
            .exit_code
            .is_some_and(|code| self.descriptor().accepts_exit_code(code))
    }

    fn parse_output(&self, output: &ToolOutput) -> Result<Vec<NormalizedFinding>, ScanError>;

    /// Prepare, execute, judge and parse. Never fails: every outcome is an
    /// [`AdapterResult`].
    async fn run(&self, runner: &ProcessRunner, ctx: &AdapterContext) -> AdapterResult {
        run_adapter(self, runner, ctx).await
    }
}

/// Start of every command: the executable and its fixed leading arguments.
pub fn base_command(descriptor: &ScannerDescriptor) -> CommandSpec {
    CommandSpec::new(&descriptor.executable).args(&descriptor.argument_template)
}

enum Failure {
    Cancelled,
    Scan(ScanError),
}

impl From<ScanError> for Failure {
    fn from(err: ScanError) -> Self {
        Failure::Scan(err)
    }
}

impl From<RunnerError> for Failure {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Cancelled => Failure::Cancelled,
            other => Failure::Scan(other.into()),
        }
    }
}

#[instrument(skip_all, fields(job_id = %ctx.job_id, scanner = %adapter.name()))]
async fn run_adapter<A>(adapter: &A, runner: &ProcessRunner, ctx: &AdapterContext) -> AdapterResult
where
    A: ToolAdapter + ?Sized,
{
    let started_at = Utc::now();
    let name = adapter.name();

    let output = match execute_tool(adapter, runner, ctx).await {
        Ok(output) => output,
        Err(Failure::Cancelled) => {
            info!("Adapter cancelled");
            return AdapterResult::cancelled(name).with_timing(started_at);
        }
        Err(Failure::Scan(err)) => {
            warn!(error = %err, code = err.code(), "Adapter failed before producing output");
            return AdapterResult::failed(name, &err).with_timing(started_at);
        }
    };

    if ctx.keep_artifacts {
        write_artifacts(ctx, &output).await;
    }

    let parsed = if adapter.accepts_exit(&output) {
        adapter.parse_output(&output)
    } else {
        Err(exit_error(name, &output))
    };

    let result = match parsed {
        Ok(findings) => {
            info!(
                exit_code = ?output.exit_code,
                findings = findings.len(),
                truncated = output.truncated,
                "Adapter completed"
            );
            AdapterResult::succeeded(name, findings)
        }
        Err(err) => {
            warn!(exit_code = ?output.exit_code, error = %err, code = err.code(), "Adapter failed");
            AdapterResult::failed(name, &err)
        }
    };

    result
        .with_process_output(output.exit_code, &output.stdout, &output.stderr, output.truncated)
        .with_timing(started_at)
}

async fn execute_tool<A>(
    adapter: &A,
    runner: &ProcessRunner,
    ctx: &AdapterContext,
) -> Result<ToolOutput, Failure>
where
    A: ToolAdapter + ?Sized,
{
    if ctx.cancel.is_cancelled() {
        return Err(Failure::Cancelled);
    }

    tokio::fs::create_dir_all(&ctx.work_dir).await.map_err(|e| {
        ScanError::internal(format!(
            "Failed to create work directory {}: {}",
            ctx.work_dir.display(),
            e
        ))
    })?;

    let source = match adapter.prepare(runner, ctx).await {
        Ok(source) => source,
        Err(_) if ctx.cancel.is_cancelled() => return Err(Failure::Cancelled),
        Err(err) => return Err(err.into()),
    };

    let invocation = adapter.build_invocation(ctx, &source)?;
    debug!(command = %invocation.command.display(), "Built invocation");

    let process = runner
        .execute(&invocation.command, ctx.timeout, &ctx.cancel)
        .await?;

    let limit = runner.config().max_output_bytes;
    let mut report_truncated = false;
    let report = match &invocation.report_path {
        Some(path) => read_capped(path, limit)
            .await
            .map_err(|e| {
                ScanError::internal(format!("Failed to read report {}: {}", path.display(), e))
            })?
            .map(|captured| {
                report_truncated = captured.truncated;
                captured.into_string()
            }),
        None => None,
    };

    Ok(ToolOutput {
        truncated: process.truncated() || report_truncated,
        stdout_truncated: process.stdout_truncated,
        report_truncated,
        stdout: process.stdout,
        stderr: process.stderr,
        report,
        exit_code: process.exit_code,
        source_root: source.path,
    })
}

fn exit_error(name: &str, output: &ToolOutput) -> ScanError {
    let status = match output.exit_code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    };
    with_stderr(format!("{} {}", name, status), output)
}

fn with_stderr(message: String, output: &ToolOutput) -> ScanError {
    let stderr = tail(output.stderr.trim(), 500);
    if stderr.is_empty() {
        ScanError::execution(message)
    } else {
        ScanError::execution(format!("{}: {}", message, stderr))
    }
}

async fn write_artifacts(ctx: &AdapterContext, output: &ToolOutput) {
    for (file, contents) in [("output.stdout", &output.stdout), ("output.stderr", &output.stderr)] {
        if let Err(e) = tokio::fs::write(ctx.work_file(file), contents).await {
            warn!(file, error = %e, "Failed to write raw output artifact");
        }
    }
}
