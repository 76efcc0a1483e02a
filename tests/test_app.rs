//! End-to-end tests against the fully wired application

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use scanhub::scanhub_core::config::ScannerOverride;
use scanhub::{AppHandle, Config, create_app};

fn test_config(work_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.scan.work_dir = work_dir.to_path_buf();
    config
}

async fn call(app: &AppHandle, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_bundled_scanners_are_registered() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(test_config(dir.path())).await.unwrap();

    let (status, body) = call(&app, get("/scanners")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 11);
    let names: Vec<&str> = body["scanners"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    for expected in ["nuclei", "httpx", "gitleaks", "semgrep", "yara"] {
        assert!(names.contains(&expected), "missing {}", expected);
    }
}

#[tokio::test]
async fn test_disabled_scanner_is_not_registered() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.scanners.insert(
        "wpscan".into(),
        ScannerOverride {
            enabled: false,
            ..Default::default()
        },
    );
    let app = create_app(config).await.unwrap();

    let (_, body) = call(&app, get("/scanners")).await;
    assert_eq!(body["total"], 10);
}

#[tokio::test]
async fn test_missing_executable_fails_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.scanners.insert(
        "httpx".into(),
        ScannerOverride {
            executable: Some("/nonexistent/bin/httpx".into()),
            ..Default::default()
        },
    );
    let app = create_app(config).await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/scans")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"target": "example.com", "scanners": ["httpx"]}).to_string(),
        ))
        .unwrap();
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let mut last = Value::Null;
    for _ in 0..200 {
        let (_, body) = call(&app, get(&format!("/scans/{}", job_id))).await;
        if body["status"] == "Failed" {
            last = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    assert_eq!(last["status"], "Failed");
    assert_eq!(last["report"]["adapters"]["httpx"]["status"], "error");
    assert_eq!(last["report"]["adapters"]["httpx"]["kind"], "execution");
    assert_eq!(last["error"], "All 1 scanners failed");
}

#[tokio::test]
async fn test_target_outside_allow_list_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.scan.allowed_target_patterns = vec![r"(^|\.)example\.com$".into()];
    let app = create_app(config).await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/scans")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"target": "evil.test", "scanners": ["httpx"]}).to_string(),
        ))
        .unwrap();
    let (status, body) = call(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_shutdown_stops_accepting_work() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(test_config(dir.path())).await.unwrap();

    assert_eq!(app.shutdown().await, 0);
    assert!(app.shutdown_token.is_cancelled());
}

#[tokio::test]
async fn test_invalid_allow_list_pattern_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.scan.allowed_target_patterns = vec!["([a-z".into()];

    assert!(create_app(config).await.is_err());
}
