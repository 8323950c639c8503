use axum::{extract::Path, Extension, Json};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use super::{ApiResponse, Result};
use crate::manager::{Manager, Operation, OperationOutcome};
use crate::model::locations;
use crate::services::workers;
use crate::Services;

#[derive(Debug, Deserialize, ToSchema)]
pub struct OperationRequest {
    #[serde(default)]
    pub register: bool,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub dry: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OperationReport {
    pub done: usize,
    pub scheduled: usize,
    pub error: usize,
    pub registered: usize,
    pub inconsistent: usize,
    pub to_register: usize,
    pub dry: usize,
    pub created: usize,
}

impl From<crate::manager::OperationSummary> for OperationReport {
    fn from(summary: crate::manager::OperationSummary) -> Self {
        Self {
            done: summary.count(OperationOutcome::Done),
            scheduled: summary.count(OperationOutcome::Scheduled),
            error: summary.count(OperationOutcome::Error),
            registered: summary.count(OperationOutcome::Registered),
            inconsistent: summary.count(OperationOutcome::Inconsistent),
            to_register: summary.count(OperationOutcome::ToRegister),
            dry: summary.count(OperationOutcome::Dry),
            created: summary.count(OperationOutcome::Created),
        }
    }
}

async fn run(services: &Services, recid: &str, operation: Operation, req: OperationRequest) -> Result<OperationReport> {
    let record_uuid = services.resolve_recid(recid).await?;
    let catalog = services.catalog();
    let locations = locations::list(services.pool()).await?;
    let storage = services.storage(locations);
    let manager = Manager::new(services.pool(), &catalog, &storage);
    let summary = manager
        .do_operation(operation, record_uuid, req.limit, req.register, req.force, req.dry)
        .await;
    Ok(summary.into())
}

#[utoipa::path(
    post,
    path = "/records/{recid}/archive",
    params(("recid" = String, Path, description = "External record identifier")),
    request_body = OperationRequest,
    responses(
        (status = 200, description = "Archive operation report", body = OperationReport),
        (status = 500, description = "Internal server error")
    ),
    tag = "operations"
)]
#[instrument(skip(services))]
pub async fn archive(
    Extension(services): Extension<Services>,
    Path(recid): Path<String>,
    Json(req): Json<OperationRequest>,
) -> Result<ApiResponse<OperationReport>> {
    let report = run(&services, &recid, Operation::Archive, req).await?;
    Ok(ApiResponse {
        data: report,
        code: StatusCode::OK,
    })
}

#[utoipa::path(
    post,
    path = "/records/{recid}/stage",
    params(("recid" = String, Path, description = "External record identifier")),
    request_body = OperationRequest,
    responses(
        (status = 200, description = "Stage operation report", body = OperationReport),
        (status = 500, description = "Internal server error")
    ),
    tag = "operations"
)]
#[instrument(skip(services))]
pub async fn stage(
    Extension(services): Extension<Services>,
    Path(recid): Path<String>,
    Json(req): Json<OperationRequest>,
) -> Result<ApiResponse<OperationReport>> {
    let report = run(&services, &recid, Operation::Stage, req).await?;
    Ok(ApiResponse {
        data: report,
        code: StatusCode::OK,
    })
}

#[utoipa::path(
    post,
    path = "/records/{recid}/clear-hot",
    params(("recid" = String, Path, description = "External record identifier")),
    request_body = OperationRequest,
    responses(
        (status = 200, description = "Clear-hot operation report", body = OperationReport),
        (status = 500, description = "Internal server error")
    ),
    tag = "operations"
)]
#[instrument(skip(services))]
pub async fn clear_hot(
    Extension(services): Extension<Services>,
    Path(recid): Path<String>,
    Json(req): Json<OperationRequest>,
) -> Result<ApiResponse<OperationReport>> {
    let report = run(&services, &recid, Operation::ClearHot, req).await?;
    Ok(ApiResponse {
        data: report,
        code: StatusCode::OK,
    })
}

#[utoipa::path(
    post,
    path = "/process-transfers",
    responses((status = 202, description = "Transfer poller cycle triggered")),
    tag = "operations"
)]
#[instrument(skip(services))]
pub async fn trigger_process_transfers(Extension(services): Extension<Services>) -> StatusCode {
    workers::process_transfers(&services).await;
    StatusCode::ACCEPTED
}

#[utoipa::path(
    post,
    path = "/process-requests",
    responses((status = 202, description = "Request driver cycle triggered")),
    tag = "operations"
)]
#[instrument(skip(services))]
pub async fn trigger_process_requests(Extension(services): Extension<Services>) -> StatusCode {
    workers::process_requests(&services).await;
    StatusCode::ACCEPTED
}
