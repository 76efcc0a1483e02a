//! Route definitions and server setup

use std::time::Duration;

use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{
    Router,
    response::{IntoResponse, Response},
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use scanhub_core::Config;
use scanhub_core::domain::{
    AdapterErrorKind, AdapterStatus, FindingCategory, FindingLocation, NormalizedFinding,
    OutputFormat, Severity, SeverityBreakdown, TargetKind, ToolParameter,
};

use crate::domain::{AdapterPhase, JobStatus, JobTransition, ReportSummary, ScanReport};
use crate::presentation::controllers::{
    OrchestratorState,
    health::health_check,
    scanners::list_scanners,
    scans::{cancel_scan, get_scan, submit_scan},
};
use crate::presentation::models::*;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::controllers::scans::submit_scan,
        crate::presentation::controllers::scans::get_scan,
        crate::presentation::controllers::scans::cancel_scan,
        crate::presentation::controllers::scanners::list_scanners,
        crate::presentation::controllers::health::health_check
    ),
    components(
        schemas(
            ScanRequest,
            ScannerSelectionDto,
            ScanAcceptedResponse,
            ScanStatusResponse,
            CancelResponse,
            ScannerInfo,
            ScannerListResponse,
            ErrorResponse,
            HealthResponse,
            ScanReport,
            ReportSummary,
            JobStatus,
            JobTransition,
            AdapterPhase,
            AdapterStatus,
            AdapterErrorKind,
            NormalizedFinding,
            FindingLocation,
            FindingCategory,
            Severity,
            SeverityBreakdown,
            OutputFormat,
            TargetKind,
            ToolParameter
        )
    ),
    tags(
        (name = "scans", description = "Scan job submission, status and cancellation"),
        (name = "scanners", description = "Registered security scanners"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "ScanHub API",
        description = "Runs external security scanners against a target and aggregates their findings",
        license(name = "AGPL-3.0-or-later")
    )
)]
pub struct ApiDoc;

/// Create the application router
pub fn create_router(state: OrchestratorState, config: &Config) -> Router {
    let scan_routes = Router::new()
        .route("/scans", axum::routing::post(submit_scan))
        .route("/scans/{job_id}", get(get_scan).delete(cancel_scan))
        .route("/scanners", get(list_scanners));

    async fn root_handler() -> Response {
        axum::Json(serde_json::json!({
            "name": "ScanHub API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "scans": "/scans",
                "scanners": "/scanners",
                "health": "/health",
                "docs": "/docs"
            }
        }))
        .into_response()
    }

    let mut router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .merge(scan_routes);

    // Keep docs off in production unless asked for
    if config.server.enable_docs {
        router =
            router.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server.allowed_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.request_timeout_seconds),
        ));

    router.layer(service_builder).with_state(state)
}

/// `["*"]` allows any origin; otherwise only the listed ones.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.len() == 1 && allowed_origins[0] == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| {
                        tracing::warn!(origin, "Invalid CORS origin in config; skipping");
                    })
                    .ok()
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
        .max_age(Duration::from_secs(3600))
}
