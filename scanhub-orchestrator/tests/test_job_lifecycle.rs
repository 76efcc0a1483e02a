//! Jobs flowing through submission, the queue and the worker pool

mod common;

use std::sync::Arc;
use std::time::Duration;

use scanhub_core::domain::{ScanError, ScannerSelection, Severity};
use scanhub_orchestrator::application::SubmitScanError;
use scanhub_orchestrator::domain::{AdapterPhase, JobStatus};
use scanhub_orchestrator::infrastructure::job_queue::{
    JobQueueError, JobWorkerContext, QueuedScan, process_job,
};
use scanhub_orchestrator::infrastructure::ArtifactStore;

use common::{CannedAdapter, ShellAdapter, TestApp, coordinator, wait_for_terminal};

fn select(names: &[&str]) -> Vec<ScannerSelection> {
    names.iter().map(|n| ScannerSelection::new(*n)).collect()
}

#[tokio::test]
async fn test_submitted_job_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::new(
        vec![
            CannedAdapter::new("httpProbe")
                .with_findings(&[Severity::Info, Severity::Low, Severity::Medium])
                .arc(),
            CannedAdapter::new("secretScanner").arc(),
        ],
        dir.path(),
    );

    let job = app
        .state
        .submit_scan_use_case
        .execute("example.com", select(&["httpProbe", "secretScanner"]))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    let snapshot = wait_for_terminal(&app.workflow, job.job_id).await;
    assert_eq!(snapshot.status(), JobStatus::Completed);
    assert!(snapshot.job.started_at.is_some());
    assert!(snapshot.job.completed_at.is_some());
    assert!(
        snapshot
            .job
            .adapter_progress
            .values()
            .all(|phase| *phase == AdapterPhase::Completed)
    );

    let report = snapshot.report.unwrap();
    assert_eq!(report.findings.len(), 3);
    assert_eq!(report.findings[0].severity, Severity::Medium);
    assert_eq!(report.summary.adapters_succeeded, 2);

    let statuses: Vec<_> = snapshot.job.transitions.iter().map(|t| t.to).collect();
    assert_eq!(statuses, vec![JobStatus::Running, JobStatus::Completed]);
}

#[tokio::test]
async fn test_invalid_submission_creates_no_job() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::new(vec![CannedAdapter::new("httpx").arc()], dir.path());

    let err = app
        .state
        .submit_scan_use_case
        .execute("example.com", select(&["httpx", "masscan"]))
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitScanError::Rejected(ScanError::Validation(_))));

    let err = app
        .state
        .submit_scan_use_case
        .execute("not a target", select(&["httpx"]))
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitScanError::Rejected(ScanError::Validation(_))));

    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_missing_required_parameter_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::new(
        vec![CannedAdapter::new("trivy").required(&["imageName"]).arc()],
        dir.path(),
    );

    let err = app
        .state
        .submit_scan_use_case
        .execute("example.com", select(&["trivy"]))
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitScanError::Rejected(ScanError::Validation(_))));
}

#[tokio::test]
async fn test_full_queue_rejects_and_discards_job() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::without_workers(vec![CannedAdapter::new("httpx").arc()], dir.path(), 1);
    let submit = &app.state.submit_scan_use_case;

    let first = submit
        .execute("example.com", select(&["httpx"]))
        .await
        .unwrap();
    let err = submit
        .execute("example.org", select(&["httpx"]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SubmitScanError::Queue(JobQueueError::QueueFull { capacity: 1 })
    ));
    assert_eq!(app.store.len().await, 1);
    assert!(app.workflow.get_job(first.job_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_job_cancelled_while_queued_fails_before_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::without_workers(vec![CannedAdapter::new("httpx").arc()], dir.path(), 4);

    let job = app
        .state
        .submit_scan_use_case
        .execute("example.com", select(&["httpx"]))
        .await
        .unwrap();
    let outcome = app
        .state
        .cancel_scan_use_case
        .execute(job.job_id)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.cancelled);
    assert_eq!(outcome.status, JobStatus::Pending);

    // Hand the queued job to a worker by hand
    let cancel = app.cancellations.token(job.job_id).await.unwrap();
    let ctx = JobWorkerContext {
        workflow: app.workflow.clone(),
        coordinator: Arc::new(coordinator(
            vec![CannedAdapter::new("httpx").arc()],
            dir.path(),
            4,
        )),
        cancellations: app.cancellations.clone(),
        artifacts: ArtifactStore::new(dir.path(), false),
    };
    process_job(ctx, QueuedScan { job, cancel }).await.unwrap();

    let snapshot = app
        .workflow
        .get_job(outcome.job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.status(), JobStatus::Failed);
    assert_eq!(snapshot.job.error.as_deref(), Some("Cancelled before dispatch"));
    assert!(snapshot.job.started_at.is_none());
    assert!(app.cancellations.token(outcome.job_id).await.is_none());
}

#[tokio::test]
async fn test_cancelling_running_job_fails_it_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::new(
        vec![
            CannedAdapter::new("slow")
                .with_delay(Duration::from_secs(30))
                .arc(),
        ],
        dir.path(),
    );
    let cancel = &app.state.cancel_scan_use_case;

    let job = app
        .state
        .submit_scan_use_case
        .execute("example.com", select(&["slow"]))
        .await
        .unwrap();

    // Wait for the worker to pick it up
    for _ in 0..100 {
        let snapshot = app.workflow.get_job(job.job_id).await.unwrap().unwrap();
        if snapshot.status() == JobStatus::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(cancel.execute(job.job_id).await.unwrap().unwrap().cancelled);
    let snapshot = wait_for_terminal(&app.workflow, job.job_id).await;
    assert_eq!(snapshot.status(), JobStatus::Failed);

    let again = cancel.execute(job.job_id).await.unwrap().unwrap();
    assert!(!again.cancelled);
    assert_eq!(again.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_cancelling_unknown_job_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::new(Vec::new(), dir.path());

    let outcome = app
        .state
        .cancel_scan_use_case
        .execute(uuid::Uuid::new_v4())
        .await
        .unwrap();
    assert!(outcome.is_none());
}

#[tokio::test]
async fn test_work_directory_is_removed_after_job() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::new(
        vec![ShellAdapter::arc("probe", "echo up", Duration::from_secs(10))],
        dir.path(),
    );

    let job = app
        .state
        .submit_scan_use_case
        .execute("example.com", select(&["probe"]))
        .await
        .unwrap();
    wait_for_terminal(&app.workflow, job.job_id).await;
    // Finalization runs right after the terminal snapshot is saved
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!dir.path().join(job.job_id.to_string()).exists());
}

#[tokio::test]
async fn test_shutdown_stops_worker_pool() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = TestApp::new(vec![CannedAdapter::new("httpx").arc()], dir.path());

    app.shutdown.cancel();
    let workers = app.workers.take().unwrap();
    tokio::time::timeout(Duration::from_secs(2), workers)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_shutdown_fails_queued_jobs_and_releases_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = TestApp::new(
        vec![
            CannedAdapter::new("slow")
                .with_delay(Duration::from_secs(30))
                .arc(),
        ],
        dir.path(),
    );

    let mut jobs = Vec::new();
    for _ in 0..3 {
        let job = app
            .state
            .submit_scan_use_case
            .execute("example.com", select(&["slow"]))
            .await
            .unwrap();
        jobs.push(job.job_id);
    }

    // Both workers busy, third job still queued
    for job_id in &jobs[..2] {
        for _ in 0..100 {
            let snapshot = app.workflow.get_job(*job_id).await.unwrap().unwrap();
            if snapshot.status() == JobStatus::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    app.shutdown.cancel();
    let workers = app.workers.take().unwrap();
    tokio::time::timeout(Duration::from_secs(2), workers)
        .await
        .unwrap()
        .unwrap();

    let queued = app.workflow.get_job(jobs[2]).await.unwrap().unwrap();
    assert_eq!(queued.status(), JobStatus::Failed);
    assert_eq!(queued.job.error.as_deref(), Some("Service shutting down"));
    assert!(app.cancellations.token(jobs[2]).await.is_none());
    assert_eq!(app.cancellations.len().await, 2);

    // Cancelling the running jobs empties the registry well before any drain timeout
    assert_eq!(app.cancellations.cancel_all().await, 2);
    tokio::time::timeout(Duration::from_secs(2), async {
        while !app.cancellations.is_empty().await {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}
