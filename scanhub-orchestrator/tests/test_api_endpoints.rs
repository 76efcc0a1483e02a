//! HTTP API driven through the router with `oneshot`

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use scanhub_core::domain::Severity;

use common::{CannedAdapter, TestApp};

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_scan(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/scans")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn app(dir: &std::path::Path) -> TestApp {
    TestApp::new(
        vec![
            CannedAdapter::new("httpProbe")
                .with_findings(&[Severity::Info, Severity::High, Severity::Low])
                .arc(),
            CannedAdapter::new("secretScanner").arc(),
            CannedAdapter::new("imageScanner")
                .required(&["imageName"])
                .arc(),
        ],
        dir,
    )
}

#[tokio::test]
async fn test_submit_then_poll_until_report() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = send(
        &app,
        post_scan(json!({
            "target": "example.com",
            "scanners": ["httpProbe", {"name": "secretScanner"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "Pending");
    assert_eq!(body["message"], "Scan job accepted.");
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let mut last = Value::Null;
    for _ in 0..100 {
        let (status, body) = send(&app, get(&format!("/scans/{}", job_id))).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == "Completed" {
            last = body;
            break;
        }
        assert!(body.get("report").is_none());
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(last["target"], "example.com");
    assert_eq!(last["progress"]["httpProbe"], "completed");
    let report = &last["report"];
    assert_eq!(report["summary"]["totalFindings"], 3);
    assert_eq!(report["findings"][0]["severity"], "high");
    assert_eq!(report["adapters"]["secretScanner"]["status"], "success");
}

#[tokio::test]
async fn test_invalid_target_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = send(
        &app,
        post_scan(json!({"target": "-oX /etc/passwd", "scanners": ["httpProbe"]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_unknown_scanner_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = send(
        &app,
        post_scan(json!({"target": "example.com", "scanners": ["masscan"]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("masscan"));
}

#[tokio::test]
async fn test_empty_selection_and_missing_parameter_are_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, _) = send(
        &app,
        post_scan(json!({"target": "example.com", "scanners": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        post_scan(json!({"target": "example.com", "scanners": ["imageScanner"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("imageName"));
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = send(&app, post_scan(json!({"scanners": ["httpProbe"]}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_job_is_404_and_malformed_id_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = send(&app, get(&format!("/scans/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(&app, get("/scans/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JOB_ID");

    let (status, _) = send(&app, delete(&format!("/scans/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_finished_job_reports_not_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (_, body) = send(
        &app,
        post_scan(json!({"target": "example.com", "scanners": ["secretScanner"]})),
    )
    .await;
    let job_id: uuid::Uuid = body["jobId"].as_str().unwrap().parse().unwrap();
    common::wait_for_terminal(&app.workflow, job_id).await;

    let (status, body) = send(&app, delete(&format!("/scans/{}", job_id))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["cancelled"], false);
    assert_eq!(body["status"], "Completed");
}

#[tokio::test]
async fn test_full_queue_is_503() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::without_workers(vec![CannedAdapter::new("httpx").arc()], dir.path(), 1);
    let request = || post_scan(json!({"target": "example.com", "scanners": ["httpx"]}));

    let (status, _) = send(&app, request()).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = send(&app, request()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "QUEUE_FULL");
}

#[tokio::test]
async fn test_list_scanners() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = send(&app, get("/scanners")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["scanners"][0]["name"], "httpProbe");
    assert_eq!(body["scanners"][2]["requiredParameters"][0], "imageName");
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["scanners"], 3);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = send(&app, get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/scans").is_some());
    assert!(body["paths"].get("/scans/{job_id}").is_some());
}
