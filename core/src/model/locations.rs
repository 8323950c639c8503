use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::Error;

/// A (hot prefix, cold prefix, back-end) triple the router matches against.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Location {
    pub id: Uuid,
    pub hot_path: String,
    pub cold_path: String,
    pub manager_class: String,
    pub created_at: NaiveDateTime,
}

pub async fn list(pool: &PgPool) -> Result<Vec<Location>, Error> {
    let rows = sqlx::query_as!(
        Location,
        r#"SELECT id, hot_path, cold_path, manager_class, created_at
           FROM cold_locations ORDER BY length(hot_path) DESC"#
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create(
    pool: &PgPool,
    hot_path: &str,
    cold_path: &str,
    manager_class: &str,
) -> Result<Location, Error> {
    let now = Utc::now().naive_utc();
    let row = sqlx::query_as!(
        Location,
        r#"INSERT INTO cold_locations (id, hot_path, cold_path, manager_class, created_at)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING id, hot_path, cold_path, manager_class, created_at"#,
        Uuid::new_v4(),
        hot_path,
        cold_path,
        manager_class,
        now,
    )
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), Error> {
    sqlx::query!("DELETE FROM cold_locations WHERE id = $1", id)
        .execute(pool)
        .await?;
    Ok(())
}
