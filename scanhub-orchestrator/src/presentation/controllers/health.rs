use axum::{extract::State, response::Json};
use chrono::Utc;

use crate::presentation::controllers::OrchestratorState;
use crate::presentation::models::HealthResponse;

/// GET /health - Liveness check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<OrchestratorState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        details: Some(serde_json::json!({
            "scanners": state.registry.len(),
            "queuedJobs": state.queue.depth(),
        })),
    })
}
