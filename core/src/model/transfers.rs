use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferAction {
    Archive,
    Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    Done,
    Failed,
}

/// A single in-flight or completed copy job, bound to exactly one
/// (file, action) pair while unfinished (enforced by a partial unique
/// index; see migrations).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Transfer {
    pub id: i64,
    pub record_uuid: Uuid,
    pub file_id: Uuid,
    pub action: TransferAction,
    pub new_filename: String,
    pub method: String,
    pub method_id: Option<String>,
    pub submitted_at: NaiveDateTime,
    pub last_check: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    pub status: TransferStatus,
    pub reason: Option<String>,
    pub size: i64,
}

pub struct NewTransfer {
    pub record_uuid: Uuid,
    pub file_id: Uuid,
    pub action: TransferAction,
    pub new_filename: String,
    pub method: String,
    pub method_id: Option<String>,
    pub size: i64,
}

pub async fn create(pool: &PgPool, new: NewTransfer) -> Result<Transfer, Error> {
    let now = Utc::now().naive_utc();
    let transfer = sqlx::query_as!(
        Transfer,
        r#"INSERT INTO cold_transfers
            (record_uuid, file_id, action, new_filename, method, method_id,
             submitted_at, last_check, status, size)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $7, 'PENDING', $8)
           RETURNING id, record_uuid, file_id,
                     action as "action: TransferAction",
                     new_filename, method, method_id,
                     submitted_at, last_check, finished_at,
                     status as "status: TransferStatus",
                     reason, size"#,
        new.record_uuid,
        new.file_id,
        new.action as TransferAction,
        new.new_filename,
        new.method,
        new.method_id,
        now,
        new.size,
    )
    .fetch_one(pool)
    .await?;
    Ok(transfer)
}

pub async fn is_scheduled(
    pool: &PgPool,
    file_id: Uuid,
    action: TransferAction,
) -> Result<bool, Error> {
    let row = sqlx::query!(
        r#"SELECT 1 as "exists!" FROM cold_transfers
           WHERE file_id = $1 AND action = $2 AND finished_at IS NULL
           LIMIT 1"#,
        file_id,
        action as TransferAction,
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// Ordered by `last_check` ascending so polling is fair (spec §4.4).
pub async fn get_ongoing_transfers(pool: &PgPool, now: NaiveDateTime) -> Result<Vec<Transfer>, Error> {
    let transfers = sqlx::query_as!(
        Transfer,
        r#"SELECT id, record_uuid, file_id,
                  action as "action: TransferAction",
                  new_filename, method, method_id,
                  submitted_at, last_check, finished_at,
                  status as "status: TransferStatus",
                  reason, size
           FROM cold_transfers
           WHERE finished_at IS NULL AND last_check <= $1
           ORDER BY last_check ASC"#,
        now,
    )
    .fetch_all(pool)
    .await?;
    Ok(transfers)
}

pub async fn touch_last_check(pool: &PgPool, id: i64, now: NaiveDateTime) -> Result<(), Error> {
    sqlx::query!("UPDATE cold_transfers SET last_check = $2 WHERE id = $1", id, now)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_finished(
    pool: &PgPool,
    id: i64,
    status: TransferStatus,
    reason: Option<String>,
    now: NaiveDateTime,
) -> Result<(), Error> {
    sqlx::query!(
        r#"UPDATE cold_transfers
           SET finished_at = $2, status = $3, reason = $4
           WHERE id = $1"#,
        id,
        now,
        status as TransferStatus,
        reason,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Used by availability derivation's `requested` override (spec §4.9):
/// true if this record has any unfinished `stage` Transfer.
pub async fn has_unfinished_for_record(
    pool: &PgPool,
    record_uuid: Uuid,
    action: TransferAction,
) -> Result<bool, Error> {
    let row = sqlx::query!(
        r#"SELECT 1 as "exists!" FROM cold_transfers
           WHERE record_uuid = $1 AND action = $2 AND finished_at IS NULL
           LIMIT 1"#,
        record_uuid,
        action as TransferAction,
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

pub async fn count_active(pool: &PgPool, action: TransferAction) -> Result<i64, Error> {
    let row = sqlx::query!(
        r#"SELECT COUNT(*) as "count!" FROM cold_transfers
           WHERE action = $1 AND finished_at IS NULL"#,
        action as TransferAction,
    )
    .fetch_one(pool)
    .await?;
    Ok(row.count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_action_round_trips_through_strings() {
        assert_eq!("archive".parse::<TransferAction>().unwrap(), TransferAction::Archive);
        assert_eq!(TransferAction::Stage.to_string(), "stage");
    }

    #[test]
    fn transfer_status_round_trips_through_strings() {
        assert_eq!("DONE".parse::<TransferStatus>().unwrap(), TransferStatus::Done);
        assert_eq!(TransferStatus::Failed.to_string(), "FAILED");
    }
}
