use axum::{extract::State, response::Json};

use crate::presentation::controllers::OrchestratorState;
use crate::presentation::models::{ScannerInfo, ScannerListResponse};

/// GET /scanners - Registered scanners and their capabilities
#[utoipa::path(
    get,
    path = "/scanners",
    responses(
        (status = 200, description = "Registered scanners", body = ScannerListResponse)
    ),
    tag = "scanners"
)]
pub async fn list_scanners(State(state): State<OrchestratorState>) -> Json<ScannerListResponse> {
    let scanners: Vec<ScannerInfo> = state
        .registry
        .descriptors()
        .into_iter()
        .map(ScannerInfo::from)
        .collect();
    let total = scanners.len();
    Json(ScannerListResponse { scanners, total })
}
