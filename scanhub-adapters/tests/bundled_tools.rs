//! Bundled adapters driven by stand-in shell scripts

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use scanhub_adapters::tools::{GitleaksAdapter, HttpxAdapter};
use scanhub_adapters::{AdapterContext, ToolAdapter};
use scanhub_core::domain::{AdapterErrorKind, AdapterStatus, ScanTarget, ScannerDescriptor};
use scanhub_runner::{ProcessRunner, RunnerConfig};

/// Point a descriptor at `sh <script>`, keeping the tool's own leading args.
fn scripted(mut descriptor: ScannerDescriptor, dir: &Path, script: &str) -> ScannerDescriptor {
    let path = dir.join(format!("{}.sh", descriptor.name));
    std::fs::write(&path, script).unwrap();
    descriptor.executable = "sh".into();
    descriptor
        .argument_template
        .insert(0, path.to_string_lossy().into_owned());
    descriptor
}

fn runner(max_output_bytes: usize) -> ProcessRunner {
    ProcessRunner::new(RunnerConfig {
        max_output_bytes,
        kill_grace: Duration::ZERO,
    })
}

fn context(target: &str, work_dir: &Path) -> AdapterContext {
    AdapterContext {
        job_id: Uuid::new_v4(),
        target: ScanTarget::parse(target).unwrap(),
        parameters: Vec::new(),
        work_dir: work_dir.join("tool"),
        timeout: Duration::from_secs(10),
        clone_timeout: Duration::from_secs(10),
        cancel: CancellationToken::new(),
        keep_artifacts: false,
    }
}

#[tokio::test]
async fn test_gitleaks_crash_without_report_is_execution_error() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("repo");
    std::fs::create_dir(&repo).unwrap();
    let adapter = GitleaksAdapter::with_descriptor(scripted(
        GitleaksAdapter::default_descriptor(),
        dir.path(),
        "echo 'FTL fatal: could not open source' >&2\nexit 1\n",
    ));

    let result = adapter
        .run(&runner(64 * 1024), &context(&repo.to_string_lossy(), dir.path()))
        .await;

    match &result.status {
        AdapterStatus::Error { kind, message } => {
            assert_eq!(*kind, AdapterErrorKind::Execution);
            assert!(message.contains("could not open source"), "{}", message);
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert_eq!(result.exit_code, Some(1));
}

#[tokio::test]
async fn test_gitleaks_report_with_leak_exit_is_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("repo");
    std::fs::create_dir(&repo).unwrap();
    // argv: detect --source <repo> --no-banner -r <report> -f json
    let adapter = GitleaksAdapter::with_descriptor(scripted(
        GitleaksAdapter::default_descriptor(),
        dir.path(),
        "echo '[{\"Description\":\"Generic key\",\"File\":\"a.env\",\"Secret\":\"abcdef123456\",\"RuleID\":\"generic\"}]' > \"$6\"\nexit 1\n",
    ));

    let result = adapter
        .run(&runner(64 * 1024), &context(&repo.to_string_lossy(), dir.path()))
        .await;

    assert_eq!(result.status, AdapterStatus::Success { findings: 1 });
}

#[tokio::test]
async fn test_stderr_overflow_keeps_last_stdout_line() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = HttpxAdapter::with_descriptor(scripted(
        HttpxAdapter::default_descriptor(),
        dir.path(),
        "head -c 5000 /dev/zero | tr '\\0' x >&2\nprintf '%s' '{\"url\":\"http://example.com\",\"status_code\":200}'\n",
    ));

    let result = adapter
        .run(&runner(1024), &context("example.com", dir.path()))
        .await;

    assert_eq!(result.status, AdapterStatus::Success { findings: 1 });
    assert!(result.truncated);
    assert_eq!(result.findings()[0].title, "HTTP service at http://example.com [200]");
}

#[tokio::test]
async fn test_stdout_overflow_drops_partial_line() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = HttpxAdapter::with_descriptor(scripted(
        HttpxAdapter::default_descriptor(),
        dir.path(),
        "echo '{\"url\":\"http://example.com\",\"status_code\":200}'\nhead -c 5000 /dev/zero | tr '\\0' x\n",
    ));

    let result = adapter
        .run(&runner(1024), &context("example.com", dir.path()))
        .await;

    assert_eq!(result.status, AdapterStatus::Success { findings: 1 });
}
