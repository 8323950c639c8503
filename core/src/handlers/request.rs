use axum::{extract::Path, Extension, Json};
use http::StatusCode;
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ApiResponse, Result};
use crate::errors::Error;
use crate::model::requests::{self, NewRequest, Request, RequestAction};
use crate::Services;

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewRequestBody {
    pub action: RequestAction,
    #[serde(default)]
    pub subscribers: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscribeRequest {
    pub email: String,
}

/// Creates a stage-back or archive Request for a record, snapshotting its
/// current hot/cold file counts and size (spec §4.5).
#[utoipa::path(
    post,
    path = "/records/{recid}/requests",
    params(("recid" = String, Path, description = "External record identifier")),
    request_body = NewRequestBody,
    responses(
        (status = 201, description = "Request created", body = Request),
        (status = 500, description = "Internal server error")
    ),
    tag = "requests"
)]
#[instrument(skip(services))]
pub async fn create(
    Extension(services): Extension<Services>,
    Path(recid): Path<String>,
    Json(body): Json<NewRequestBody>,
) -> Result<ApiResponse<Request>> {
    let record_uuid = services.resolve_recid(&recid).await?;
    let catalog = services.catalog();
    let record = catalog.get_record(record_uuid).await.ok_or(Error::NotFound)?;
    let files = catalog.get_files_from_record(&record, None);
    let num_hot_files = files.iter().filter(|f| f.is_staged()).count() as i64;
    let num_cold_files = files.iter().filter(|f| f.is_archived()).count() as i64;

    let request = requests::create(
        services.pool(),
        NewRequest {
            record_uuid,
            action: body.action,
            subscribers: body.subscribers,
            num_hot_files,
            num_cold_files,
            num_record_files: record.distribution.as_ref().map(|d| d.number_files),
            record_size: record.distribution.as_ref().map(|d| d.size),
        },
    )
    .await?;

    Ok(ApiResponse {
        data: request,
        code: StatusCode::CREATED,
    })
}

#[utoipa::path(
    get,
    path = "/records/{recid}/requests",
    params(("recid" = String, Path, description = "External record identifier")),
    responses(
        (status = 200, description = "Submitted and started requests for this record", body = Vec<Request>),
        (status = 500, description = "Internal server error")
    ),
    tag = "requests"
)]
#[instrument(skip(services))]
pub async fn list_for_record(
    Extension(services): Extension<Services>,
    Path(recid): Path<String>,
) -> Result<ApiResponse<Vec<Request>>> {
    let record_uuid = services.resolve_recid(&recid).await?;
    let mut found = Vec::new();
    for action in [RequestAction::Stage, RequestAction::Archive] {
        found.extend(
            requests::list_submitted(services.pool(), action)
                .await?
                .into_iter()
                .filter(|r| r.record_uuid == record_uuid),
        );
        found.extend(
            requests::list_started(services.pool(), action)
                .await?
                .into_iter()
                .filter(|r| r.record_uuid == record_uuid),
        );
    }
    Ok(ApiResponse {
        data: found,
        code: StatusCode::OK,
    })
}

#[utoipa::path(
    post,
    path = "/requests/{request_id}/subscribe",
    params(("request_id" = Uuid, Path, description = "Request identifier")),
    request_body = SubscribeRequest,
    responses(
        (status = 204, description = "Subscribed (or already subscribed)"),
        (status = 404, description = "Request not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "requests"
)]
#[instrument(skip(services))]
pub async fn subscribe(
    Extension(services): Extension<Services>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<SubscribeRequest>,
) -> Result<StatusCode> {
    requests::subscribe(services.pool(), request_id, &body.email).await?;
    Ok(StatusCode::NO_CONTENT)
}
