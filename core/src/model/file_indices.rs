use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::files::{Availability, File};
use crate::errors::Error;

/// A bulk manifest of files attached to a record (an uploaded `index.json`).
///
/// Materialized as an opaque "bucket" container plus one [`File`] row per
/// manifest entry, tagged `record`/`index_name`/`description` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileIndex {
    pub file_index_id: Uuid,
    pub record_uuid: Uuid,
    pub key: String,
    pub bucket: Uuid,
    pub description: Option<String>,
    #[sqlx(skip)]
    pub files: Vec<File>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileIndexSummary {
    pub key: String,
    pub number_files: usize,
    pub size: i64,
    pub availability: std::collections::HashMap<Availability, i64>,
    pub description: Option<String>,
    pub bucket: Uuid,
}

impl FileIndex {
    pub fn size(&self) -> i64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn availability_histogram(&self) -> std::collections::HashMap<Availability, i64> {
        let mut histogram = std::collections::HashMap::new();
        for file in &self.files {
            *histogram.entry(file.availability()).or_insert(0) += 1;
        }
        histogram
    }

    pub fn dump(&self) -> FileIndexSummary {
        FileIndexSummary {
            key: self.key.clone(),
            number_files: self.files.len(),
            size: self.size(),
            availability: self.availability_histogram(),
            description: self.description.clone(),
            bucket: self.bucket,
        }
    }
}

/// One entry of an uploaded `index.json` manifest (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub uri: String,
    pub size: i64,
    pub checksum: String,
}

pub struct NewFileIndex {
    pub record_uuid: Uuid,
    pub key: String,
    pub description: Option<String>,
    pub entries: Vec<ManifestEntry>,
}

pub async fn list_for_record(pool: &PgPool, record_uuid: Uuid) -> Result<Vec<FileIndex>, Error> {
    let mut indices = sqlx::query_as!(
        FileIndex,
        r#"SELECT file_index_id, record_uuid, key, bucket, description
           FROM cold_file_indices WHERE record_uuid = $1"#,
        record_uuid
    )
    .fetch_all(pool)
    .await?;

    for index in &mut indices {
        index.files = sqlx::query_as!(
            File,
            r#"SELECT file_id, record_uuid, file_index_id, key, uri_hot, size,
                      checksum, uri_cold, hot_deleted
               FROM cold_files WHERE file_index_id = $1"#,
            index.file_index_id
        )
        .fetch_all(pool)
        .await?;
    }
    Ok(indices)
}

/// Materializes an uploaded `index.json` into a bucket plus one file row per
/// manifest entry (spec §3/§6). Created once; never updated in place.
pub async fn create(pool: &PgPool, new: NewFileIndex) -> Result<FileIndex, Error> {
    let file_index_id = Uuid::new_v4();
    let bucket = Uuid::new_v4();
    sqlx::query!(
        r#"INSERT INTO cold_file_indices (file_index_id, record_uuid, key, bucket, description)
           VALUES ($1, $2, $3, $4, $5)"#,
        file_index_id,
        new.record_uuid,
        new.key,
        bucket,
        new.description,
    )
    .execute(pool)
    .await?;

    let mut files = Vec::with_capacity(new.entries.len());
    for entry in new.entries {
        let file_id = Uuid::new_v4();
        let key = entry
            .uri
            .rsplit('/')
            .next()
            .unwrap_or(&entry.uri)
            .to_string();
        sqlx::query!(
            r#"INSERT INTO cold_files (file_id, record_uuid, file_index_id, key, uri_hot, size, checksum)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
            file_id,
            new.record_uuid,
            file_index_id,
            key,
            entry.uri,
            entry.size,
            entry.checksum,
        )
        .execute(pool)
        .await?;
        files.push(File {
            file_id,
            record_uuid: new.record_uuid,
            file_index_id: Some(file_index_id),
            key,
            uri_hot: entry.uri,
            size: entry.size,
            checksum: entry.checksum,
            uri_cold: None,
            hot_deleted: None,
        });
    }

    Ok(FileIndex {
        file_index_id,
        record_uuid: new.record_uuid,
        key: new.key,
        bucket,
        description: new.description,
        files,
    })
}

/// Deletes every file-index (and, by cascade, their file rows) of a record.
pub async fn delete_for_record(pool: &PgPool, record_uuid: Uuid) -> Result<(), Error> {
    sqlx::query!(
        "DELETE FROM cold_file_indices WHERE record_uuid = $1",
        record_uuid
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn file(availability_online: bool) -> File {
        File {
            file_id: Uuid::new_v4(),
            record_uuid: Uuid::new_v4(),
            file_index_id: None,
            key: "f".into(),
            uri_hot: "hot://X/f".into(),
            size: 10,
            checksum: "adler32:deadbeef".into(),
            uri_cold: None,
            hot_deleted: if availability_online {
                None
            } else {
                Some(Utc::now().naive_utc())
            },
        }
    }

    #[test]
    fn availability_histogram_counts_by_state() {
        let index = FileIndex {
            file_index_id: Uuid::new_v4(),
            record_uuid: Uuid::new_v4(),
            key: "idx".into(),
            bucket: Uuid::new_v4(),
            description: None,
            files: vec![file(true), file(true), file(false)],
        };
        let histogram = index.availability_histogram();
        assert_eq!(histogram.get(&Availability::Online), Some(&2));
        assert_eq!(histogram.get(&Availability::OnDemand), Some(&1));
    }
}
