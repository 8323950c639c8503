use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::file_indices;
use super::file_indices::FileIndex;
use super::files::{Availability, File};
use crate::errors::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    pub number_files: i64,
    pub size: i64,
}

/// Read model returned by [`RecordStore::get_record`].
///
/// The record itself is owned by a collaborator outside this subsystem
/// (spec §1); this is the slice of its state the cold-storage core needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub uuid: Uuid,
    pub recid: String,
    pub files: Vec<File>,
    pub file_indices: Vec<FileIndex>,
    pub availability: Availability,
    pub availability_details: HashMap<Availability, i64>,
    pub distribution: Option<Distribution>,
}

/// Interface to the externally-owned record metadata store.
///
/// Out of scope for this crate to implement for real (spec §1); a
/// Postgres-backed shadow (`PostgresRecordStore`) stands in so the core can
/// be exercised without a live upstream wired in.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_record(&self, uuid: Uuid) -> Option<RecordSnapshot>;

    async fn commit_availability(
        &self,
        uuid: Uuid,
        availability: Availability,
        details: HashMap<Availability, i64>,
    ) -> Result<(), Error>;

    async fn resolve_recid(&self, recid: &str) -> Result<Uuid, Error>;
}

pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn get_record(&self, uuid: Uuid) -> Option<RecordSnapshot> {
        let record = sqlx::query!(
            r#"SELECT recid, availability as "availability: String", availability_details,
                      number_files, size
               FROM cold_records WHERE uuid = $1"#,
            uuid
        )
        .fetch_optional(&self.pool)
        .await
        .ok()??;

        let files = sqlx::query_as!(
            File,
            r#"SELECT file_id, record_uuid, file_index_id, key, uri_hot, size,
                      checksum, uri_cold, hot_deleted
               FROM cold_files WHERE record_uuid = $1 AND file_index_id IS NULL"#,
            uuid
        )
        .fetch_all(&self.pool)
        .await
        .ok()?;

        let file_indices = file_indices::list_for_record(&self.pool, uuid).await.ok()?;

        let availability: Availability = record
            .availability
            .parse()
            .unwrap_or(Availability::Online);

        let availability_details: HashMap<Availability, i64> =
            serde_json::from_value::<HashMap<String, i64>>(record.availability_details)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(k, v)| k.parse().ok().map(|k| (k, v)))
                .collect();

        Some(RecordSnapshot {
            uuid,
            recid: record.recid,
            files,
            file_indices,
            availability,
            availability_details,
            distribution: Some(Distribution {
                number_files: record.number_files.unwrap_or_default(),
                size: record.size.unwrap_or_default(),
            }),
        })
    }

    async fn commit_availability(
        &self,
        uuid: Uuid,
        availability: Availability,
        details: HashMap<Availability, i64>,
    ) -> Result<(), Error> {
        let details_json = serde_json::to_value(
            details
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<HashMap<String, i64>>(),
        )
        .unwrap_or_default();

        sqlx::query!(
            r#"UPDATE cold_records
               SET availability = $2, availability_details = $3
               WHERE uuid = $1"#,
            uuid,
            availability.to_string(),
            details_json,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn resolve_recid(&self, recid: &str) -> Result<Uuid, Error> {
        let row = sqlx::query!("SELECT uuid FROM cold_records WHERE recid = $1", recid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound)?;
        Ok(row.uuid)
    }
}
