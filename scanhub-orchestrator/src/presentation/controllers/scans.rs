use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use scanhub_core::domain::ScannerSelection;

use crate::presentation::controllers::OrchestratorState;
use crate::presentation::errors::ApiError;
use crate::presentation::models::{
    CancelResponse, ErrorResponse, ScanAcceptedResponse, ScanRequest, ScanStatusResponse,
};

fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidJobId(raw.to_string()))
}

/// POST /scans - Submit a scan job
#[utoipa::path(
    post,
    path = "/scans",
    request_body = ScanRequest,
    responses(
        (status = 202, description = "Scan job accepted", body = ScanAcceptedResponse),
        (status = 400, description = "Invalid target or scanner selection", body = ErrorResponse),
        (status = 503, description = "Job queue is full", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "scans"
)]
pub async fn submit_scan(
    State(state): State<OrchestratorState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ScanAcceptedResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let selections: Vec<ScannerSelection> =
        request.scanners.into_iter().map(Into::into).collect();

    let job = state
        .submit_scan_use_case
        .execute(&request.target, selections)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ScanAcceptedResponse {
            job_id: job.job_id,
            status: job.status,
            message: "Scan job accepted.".to_string(),
        }),
    ))
}

/// GET /scans/{job_id} - Job status, progress and report
#[utoipa::path(
    get,
    path = "/scans/{job_id}",
    params(
        ("job_id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job found", body = ScanStatusResponse),
        (status = 400, description = "Malformed job ID", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "scans"
)]
pub async fn get_scan(
    State(state): State<OrchestratorState>,
    Path(job_id): Path<String>,
) -> Result<Json<ScanStatusResponse>, ApiError> {
    let job_id = parse_job_id(&job_id)?;
    match state.get_scan_use_case.execute(job_id).await? {
        Some(snapshot) => Ok(Json(ScanStatusResponse::from(snapshot))),
        None => Err(ApiError::NotFound(job_id)),
    }
}

/// DELETE /scans/{job_id} - Cancel a job
#[utoipa::path(
    delete,
    path = "/scans/{job_id}",
    params(
        ("job_id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 202, description = "Cancellation processed", body = CancelResponse),
        (status = 400, description = "Malformed job ID", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    tag = "scans"
)]
pub async fn cancel_scan(
    State(state): State<OrchestratorState>,
    Path(job_id): Path<String>,
) -> Result<(StatusCode, Json<CancelResponse>), ApiError> {
    let job_id = parse_job_id(&job_id)?;
    let outcome = state
        .cancel_scan_use_case
        .execute(job_id)
        .await?
        .ok_or(ApiError::NotFound(job_id))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            job_id: outcome.job_id,
            status: outcome.status,
            cancelled: outcome.cancelled,
        }),
    ))
}
