//! Subprocess execution

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use scanhub_core::domain::ScanError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::capture::capture_stream;
use crate::command::CommandSpec;
use crate::guard::ProcessGroupGuard;

/// Runner limits
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Per-stream capture ceiling
    pub max_output_bytes: usize,
    /// Delay between SIGTERM and SIGKILL during group teardown
    pub kill_grace: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: 16 * 1024 * 1024,
            kill_grace: Duration::from_secs(2),
        }
    }
}

/// What a finished process left behind. The exit code is reported as-is;
/// judging it is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn truncated(&self) -> bool {
        self.stdout_truncated || self.stderr_truncated
    }
}

/// Errors raised while running a process
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Executable '{0}' not found")]
    NotFound(String),

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Process timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Process cancelled")]
    Cancelled,

    #[error("I/O error while running process: {0}")]
    Io(#[from] io::Error),
}

impl From<RunnerError> for ScanError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Timeout(after) => ScanError::Timeout(after),
            RunnerError::NotFound(_) | RunnerError::Spawn { .. } => {
                ScanError::Execution(err.to_string())
            }
            RunnerError::Cancelled => ScanError::Execution(err.to_string()),
            RunnerError::Io(e) => ScanError::Internal(e.to_string()),
        }
    }
}

/// Launches scanner processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    config: RunnerConfig,
}

impl ProcessRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Locate an executable. Names containing `/` are used as paths,
    /// bare names are looked up on `PATH`.
    pub fn resolve(&self, program: &str) -> Result<PathBuf, RunnerError> {
        if program.contains('/') {
            let path = Path::new(program);
            return if path.is_file() {
                Ok(path.to_path_buf())
            } else {
                Err(RunnerError::NotFound(program.to_string()))
            };
        }
        which::which(program).map_err(|_| RunnerError::NotFound(program.to_string()))
    }

    /// Run `spec` to completion, timeout or cancellation.
    ///
    /// A non-zero exit code is not an error. The child's process group is
    /// terminated before this returns, whichever way it ends.
    #[instrument(skip(self, spec, cancel), fields(program = %spec.program))]
    pub async fn execute(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, RunnerError> {
        if cancel.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }

        let program = self.resolve(&spec.program)?;

        let mut command = Command::new(&program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        debug!(command = %spec.display(), timeout_secs = timeout.as_secs(), "Spawning process");

        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        let mut guard = ProcessGroupGuard::new(child.id(), self.config.kill_grace);

        if let (Some(input), Some(mut stdin)) = (spec.stdin.clone(), child.stdin.take()) {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    debug!(error = %e, "Child closed stdin early");
                }
            });
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("stderr was not captured"))?;

        let limit = self.config.max_output_bytes;
        let run = async {
            let (out, err, status) = tokio::join!(
                capture_stream(stdout, limit),
                capture_stream(stderr, limit),
                child.wait()
            );
            Ok::<_, io::Error>((out?, err?, status?))
        };

        let outcome = tokio::select! {
            result = tokio::time::timeout(timeout, run) => match result {
                Ok(inner) => inner.map_err(RunnerError::from),
                Err(_) => Err(RunnerError::Timeout(timeout)),
            },
            _ = cancel.cancelled() => Err(RunnerError::Cancelled),
        };

        guard.terminate();

        match outcome {
            Ok((out, err, status)) => {
                let output = ProcessOutput {
                    stdout_truncated: out.truncated,
                    stderr_truncated: err.truncated,
                    stdout: out.into_string(),
                    stderr: err.into_string(),
                    exit_code: status.code(),
                    duration: started.elapsed(),
                };
                if output.truncated() {
                    warn!(limit, "Process output exceeded capture ceiling and was truncated");
                }
                debug!(
                    exit_code = ?output.exit_code,
                    duration_ms = output.duration.as_millis() as u64,
                    "Process finished"
                );
                Ok(output)
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms = started.elapsed().as_millis() as u64, "Process did not finish");
                Err(e)
            }
        }
    }
}
