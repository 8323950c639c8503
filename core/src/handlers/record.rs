use axum::{extract::Path, extract::Query, Extension};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use super::{ApiResponse, Result};
use crate::model::files::Availability;
use crate::model::locations;
use crate::Services;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub verify: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileReport {
    pub key: String,
    pub uri_hot: String,
    pub uri_cold: Option<String>,
    pub hot_deleted: bool,
    pub size: i64,
    pub verify_error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordReport {
    pub recid: String,
    pub availability: Availability,
    pub files: Vec<FileReport>,
    pub hot_copies: usize,
    pub cold_copies: usize,
}

/// Backs the CLI's `cold list RECID [--verify]`: one row per file plus a
/// hot/cold copy-count summary (spec §6).
#[utoipa::path(
    get,
    path = "/records/{recid}",
    params(
        ("recid" = String, Path, description = "External record identifier"),
        ("verify" = bool, Query, description = "Check existence/size/checksum of each copy"),
    ),
    responses(
        (status = 200, description = "Record file report", body = RecordReport),
        (status = 404, description = "Record not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "operations"
)]
#[instrument(skip(services))]
pub async fn get(
    Extension(services): Extension<Services>,
    Path(recid): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<RecordReport>> {
    let record_uuid = services.resolve_recid(&recid).await?;
    let catalog = services.catalog();
    let record = catalog
        .get_record(record_uuid)
        .await
        .ok_or(crate::errors::Error::NotFound)?;
    let files = catalog.get_files_from_record(&record, None);

    let storage = if query.verify {
        Some(services.storage(locations::list(services.pool()).await?))
    } else {
        None
    };

    let mut reports = Vec::with_capacity(files.len());
    let mut hot_copies = 0;
    let mut cold_copies = 0;
    for file in &files {
        if file.is_staged() {
            hot_copies += 1;
        }
        if file.is_archived() {
            cold_copies += 1;
        }

        let mut verify_errors = Vec::new();
        if let Some(storage) = &storage {
            if file.is_staged() {
                if let Err(e) = storage.verify_file(&file.uri_hot, file.size, &file.checksum).await {
                    verify_errors.push(format!("hot copy: {e}"));
                }
            }
            if file.is_archived() {
                if let Err(e) = storage
                    .verify_file(file.uri_cold.as_deref().unwrap_or_default(), file.size, &file.checksum)
                    .await
                {
                    verify_errors.push(format!("cold copy: {e}"));
                }
            }
        }
        let verify_error = (!verify_errors.is_empty()).then(|| verify_errors.join("; "));

        reports.push(FileReport {
            key: file.key.clone(),
            uri_hot: file.uri_hot.clone(),
            uri_cold: file.uri_cold.clone(),
            hot_deleted: !file.is_staged(),
            size: file.size,
            verify_error,
        });
    }

    Ok(ApiResponse {
        data: RecordReport {
            recid: record.recid,
            availability: record.availability,
            files: reports,
            hot_copies,
            cold_copies,
        },
        code: StatusCode::OK,
    })
}
