use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::Error;

/// Per-file or per-record readiness state, derived from tag state rather
/// than stored directly (except as a cached summary on the record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Online,
    OnDemand,
    Partial,
    Requested,
}

/// A single copy of a file known to the cold-storage subsystem.
///
/// `uri_cold`/`hot_deleted` are structured columns in this rewrite (see
/// DESIGN.md's "tag sets vs explicit columns" note) but `tags()` still
/// projects them into the `uri_cold`/`hot_deleted` tag vocabulary so that
/// any caller expecting the original wire shape keeps working.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct File {
    pub file_id: Uuid,
    pub record_uuid: Uuid,
    pub file_index_id: Option<Uuid>,
    pub key: String,
    pub uri_hot: String,
    pub size: i64,
    pub checksum: String,
    pub uri_cold: Option<String>,
    pub hot_deleted: Option<NaiveDateTime>,
}

impl File {
    pub fn is_archived(&self) -> bool {
        self.uri_cold.is_some()
    }

    pub fn is_staged(&self) -> bool {
        self.hot_deleted.is_none()
    }

    pub fn availability(&self) -> Availability {
        if self.hot_deleted.is_some() {
            Availability::OnDemand
        } else {
            Availability::Online
        }
    }

    /// Tag map matching the external wire vocabulary from spec §6.
    pub fn tags(&self) -> HashMap<String, String> {
        let mut tags = HashMap::new();
        if let Some(cold) = &self.uri_cold {
            tags.insert("uri_cold".to_string(), cold.clone());
        }
        if let Some(deleted_at) = &self.hot_deleted {
            tags.insert("hot_deleted".to_string(), deleted_at.to_string());
        }
        tags
    }
}

pub async fn get(pool: &PgPool, file_id: Uuid) -> Result<Option<File>, Error> {
    let file = sqlx::query_as!(
        File,
        r#"SELECT file_id, record_uuid, file_index_id, key, uri_hot, size,
                  checksum, uri_cold, hot_deleted
           FROM cold_files WHERE file_id = $1"#,
        file_id
    )
    .fetch_optional(pool)
    .await?;
    Ok(file)
}

/// Idempotent: a file already tagged `hot_deleted` keeps its original
/// timestamp (first-write-wins), matching the duplicate-tag downgrade of
/// spec §4.3.
pub async fn mark_hot_deleted(pool: &PgPool, file_id: Uuid) -> Result<(), Error> {
    let now = Utc::now().naive_utc();
    sqlx::query!(
        r#"UPDATE cold_files SET hot_deleted = $2
           WHERE file_id = $1 AND hot_deleted IS NULL"#,
        file_id,
        now,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn clear_hot_deleted(pool: &PgPool, file_id: Uuid) -> Result<(), Error> {
    sqlx::query!(
        "UPDATE cold_files SET hot_deleted = NULL WHERE file_id = $1",
        file_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_cold_uri(pool: &PgPool, file_id: Uuid, uri_cold: &str) -> Result<(), Error> {
    sqlx::query!(
        "UPDATE cold_files SET uri_cold = $2 WHERE file_id = $1",
        file_id,
        uri_cold,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> File {
        File {
            file_id: Uuid::new_v4(),
            record_uuid: Uuid::new_v4(),
            file_index_id: None,
            key: "f".into(),
            uri_hot: "hot://X/f".into(),
            size: 1053,
            checksum: "adler32:9719fd6a".into(),
            uri_cold: None,
            hot_deleted: None,
        }
    }

    #[test]
    fn availability_is_online_unless_hot_deleted() {
        let mut f = file();
        assert_eq!(f.availability(), Availability::Online);
        f.hot_deleted = Some(Utc::now().naive_utc());
        assert_eq!(f.availability(), Availability::OnDemand);
    }

    #[test]
    fn tags_projects_only_present_fields() {
        let mut f = file();
        assert!(f.tags().is_empty());
        f.uri_cold = Some("cold://Y/f".to_string());
        assert_eq!(f.tags().get("uri_cold"), Some(&"cold://Y/f".to_string()));
        assert!(!f.tags().contains_key("hot_deleted"));
    }
}
