use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

pub use super::transfers::TransferAction as RequestAction;
use crate::errors::Error;

pub use RequestAction as Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Submitted,
    Started,
    Completed,
}

/// A user-facing stage-back or archive request (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Request {
    pub id: Uuid,
    pub record_uuid: Uuid,
    pub action: RequestAction,
    pub status: RequestStatus,
    pub created_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub num_files: i64,
    pub size: i64,
    pub num_hot_files: i64,
    pub num_cold_files: i64,
    pub num_record_files: Option<i64>,
    pub record_size: Option<i64>,
    pub subscribers: Vec<String>,
}

pub struct NewRequest {
    pub record_uuid: Uuid,
    pub action: RequestAction,
    pub subscribers: Vec<String>,
    pub num_hot_files: i64,
    pub num_cold_files: i64,
    pub num_record_files: Option<i64>,
    pub record_size: Option<i64>,
}

pub async fn create(pool: &PgPool, new: NewRequest) -> Result<Request, Error> {
    let now = Utc::now().naive_utc();
    let request = sqlx::query_as!(
        Request,
        r#"INSERT INTO cold_requests
            (record_uuid, action, status, created_at, num_files, size,
             num_hot_files, num_cold_files, num_record_files, record_size, subscribers)
           VALUES ($1, $2, 'submitted', $3, 0, 0, $4, $5, $6, $7, $8)
           RETURNING id, record_uuid,
                     action as "action: RequestAction",
                     status as "status: RequestStatus",
                     created_at, started_at, completed_at,
                     num_files, size, num_hot_files, num_cold_files,
                     num_record_files, record_size, subscribers"#,
        new.record_uuid,
        new.action as RequestAction,
        now,
        new.num_hot_files,
        new.num_cold_files,
        new.num_record_files,
        new.record_size,
        &new.subscribers,
    )
    .fetch_one(pool)
    .await?;
    Ok(request)
}

pub async fn list_submitted(pool: &PgPool, action: RequestAction) -> Result<Vec<Request>, Error> {
    let rows = sqlx::query_as!(
        Request,
        r#"SELECT id, record_uuid,
                  action as "action: RequestAction",
                  status as "status: RequestStatus",
                  created_at, started_at, completed_at,
                  num_files, size, num_hot_files, num_cold_files,
                  num_record_files, record_size, subscribers
           FROM cold_requests
           WHERE action = $1 AND status = 'submitted'
           ORDER BY created_at ASC"#,
        action as RequestAction,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_started(pool: &PgPool, action: RequestAction) -> Result<Vec<Request>, Error> {
    let rows = sqlx::query_as!(
        Request,
        r#"SELECT id, record_uuid,
                  action as "action: RequestAction",
                  status as "status: RequestStatus",
                  created_at, started_at, completed_at,
                  num_files, size, num_hot_files, num_cold_files,
                  num_record_files, record_size, subscribers
           FROM cold_requests
           WHERE action = $1 AND status = 'started'
           ORDER BY created_at ASC"#,
        action as RequestAction,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Used by availability derivation's `requested` override (spec §4.9):
/// true if this record has any `submitted` Request for this action.
pub async fn has_submitted_for_record(pool: &PgPool, record_uuid: Uuid, action: RequestAction) -> Result<bool, Error> {
    let row = sqlx::query!(
        r#"SELECT 1 as "exists!" FROM cold_requests
           WHERE record_uuid = $1 AND action = $2 AND status = 'submitted'
           LIMIT 1"#,
        record_uuid,
        action as RequestAction,
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

pub async fn mark_as_started(pool: &PgPool, id: Uuid, num_files: i64, size: i64) -> Result<(), Error> {
    let now = Utc::now().naive_utc();
    sqlx::query!(
        r#"UPDATE cold_requests
           SET status = 'started', started_at = $2, num_files = num_files + $3, size = size + $4
           WHERE id = $1"#,
        id,
        now,
        num_files,
        size,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_as_completed(pool: &PgPool, id: Uuid) -> Result<Request, Error> {
    let now = Utc::now().naive_utc();
    let request = sqlx::query_as!(
        Request,
        r#"UPDATE cold_requests
           SET status = 'completed', completed_at = $2
           WHERE id = $1
           RETURNING id, record_uuid,
                     action as "action: RequestAction",
                     status as "status: RequestStatus",
                     created_at, started_at, completed_at,
                     num_files, size, num_hot_files, num_cold_files,
                     num_record_files, record_size, subscribers"#,
        id,
        now,
    )
    .fetch_one(pool)
    .await?;
    Ok(request)
}

/// Idempotent: appends `email` only if it is not already subscribed.
/// Returns whether the subscriber set changed.
pub async fn subscribe(pool: &PgPool, id: Uuid, email: &str) -> Result<bool, Error> {
    let row = sqlx::query!("SELECT subscribers FROM cold_requests WHERE id = $1", id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound)?;

    if row.subscribers.iter().any(|s| s == email) {
        return Ok(false);
    }

    let mut subscribers = row.subscribers;
    subscribers.push(email.to_string());
    sqlx::query!(
        "UPDATE cold_requests SET subscribers = $2 WHERE id = $1",
        id,
        &subscribers,
    )
    .execute(pool)
    .await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_status_round_trips() {
        assert_eq!("started".parse::<RequestStatus>().unwrap(), RequestStatus::Started);
        assert_eq!(RequestStatus::Completed.to_string(), "completed");
    }
}
