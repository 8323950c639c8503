use axum::{Extension, Json};
use http::StatusCode;
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;

use super::{ApiResponse, Result};
use crate::model::locations::{self, Location};
use crate::Services;

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewLocationRequest {
    pub hot_path: String,
    pub cold_path: String,
    pub manager_class: String,
}

#[utoipa::path(
    get,
    path = "/locations",
    responses(
        (status = 200, description = "List all known hot/cold locations", body = Vec<Location>),
        (status = 500, description = "Internal server error")
    ),
    tag = "locations"
)]
#[instrument(skip(services))]
pub async fn list(Extension(services): Extension<Services>) -> Result<ApiResponse<Vec<Location>>> {
    let locations = locations::list(services.pool()).await?;
    Ok(ApiResponse {
        data: locations,
        code: StatusCode::OK,
    })
}

#[utoipa::path(
    post,
    path = "/locations",
    request_body = NewLocationRequest,
    responses(
        (status = 201, description = "Location created", body = Location),
        (status = 500, description = "Internal server error")
    ),
    tag = "locations"
)]
#[instrument(skip(services))]
pub async fn add(
    Extension(services): Extension<Services>,
    Json(new): Json<NewLocationRequest>,
) -> Result<ApiResponse<Location>> {
    let location = locations::create(services.pool(), &new.hot_path, &new.cold_path, &new.manager_class).await?;
    Ok(ApiResponse {
        data: location,
        code: StatusCode::CREATED,
    })
}
