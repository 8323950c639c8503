//! Read/write façade over a record's file list and file-indices (spec §4.3).
//!
//! Owns its own re-index queue; constructed fresh per worker invocation or
//! per request handler, never shared across them (spec §9 "cyclic
//! ownership"/"global state").

use std::sync::Arc;
use std::sync::Mutex;

use uuid::Uuid;

use crate::model::files::{self, File};
use crate::model::records::{RecordSnapshot, RecordStore};
use crate::model::requests;
use crate::model::transfers::{self, TransferAction};

pub struct Catalog {
    pool: sqlx::PgPool,
    record_store: Arc<dyn RecordStore>,
    indexer: Arc<dyn Indexer>,
    reindex_queue: Mutex<Vec<Uuid>>,
}

/// The external search indexer collaborator (spec §1: out of scope to
/// implement for real; only the interface the core calls is specified).
#[async_trait::async_trait]
pub trait Indexer: Send + Sync {
    async fn index(&self, record_uuid: Uuid) -> Result<(), String>;
}

/// No-op indexer used where no search collaborator is wired in.
pub struct NullIndexer;

#[async_trait::async_trait]
impl Indexer for NullIndexer {
    async fn index(&self, _record_uuid: Uuid) -> Result<(), String> {
        Ok(())
    }
}

impl Catalog {
    pub fn new(pool: sqlx::PgPool, record_store: Arc<dyn RecordStore>, indexer: Arc<dyn Indexer>) -> Self {
        Self {
            pool,
            record_store,
            indexer,
            reindex_queue: Mutex::new(Vec::new()),
        }
    }

    /// Returns `None` on any error (already logged by the underlying store).
    pub async fn get_record(&self, uuid: Uuid) -> Option<RecordSnapshot> {
        self.record_store.get_record(uuid).await
    }

    /// Concatenates direct files and the flattened union of every
    /// file-index's files. `limit`, if negative, drops the last `|limit|`
    /// files from the result, leaving them untouched by the caller (spec
    /// §4.3/§4.6 — verified against scenario S6: a record with `f1, f2, f3`
    /// and `limit = -1` yields `[f1, f2]`).
    pub fn get_files_from_record(&self, record: &RecordSnapshot, limit: Option<i64>) -> Vec<File> {
        let mut files: Vec<File> = record.files.clone();
        for index in &record.file_indices {
            files.extend(index.files.iter().cloned());
        }

        if let Some(limit) = limit {
            if limit < 0 {
                let drop = (-limit) as usize;
                let keep = files.len().saturating_sub(drop);
                files.truncate(keep);
            }
        }
        files
    }

    fn enqueue_reindex(&self, record_uuid: Uuid) {
        let mut queue = self.reindex_queue.lock().expect("reindex queue poisoned");
        if !queue.contains(&record_uuid) {
            queue.push(record_uuid);
        }
    }

    /// Tags the hot copy as deleted. Duplicate-tag errors (the column is
    /// already set) are downgraded to a warning — first write wins.
    pub async fn clear_hot(&self, record_uuid: Uuid, file_id: Uuid) -> bool {
        match files::get(&self.pool, file_id).await {
            Ok(Some(file)) if file.hot_deleted.is_some() => {
                tracing::warn!(%file_id, "clear_hot: hot_deleted tag already set");
            }
            Ok(Some(_)) => {
                if let Err(e) = files::mark_hot_deleted(&self.pool, file_id).await {
                    tracing::error!(%file_id, error = %e, "clear_hot: failed to tag file");
                    return false;
                }
            }
            Ok(None) => {
                tracing::error!(%file_id, "clear_hot: file not found");
                return false;
            }
            Err(e) => {
                tracing::error!(%file_id, error = %e, "clear_hot: failed to load file");
                return false;
            }
        }
        self.enqueue_reindex(record_uuid);
        true
    }

    /// For `archive`, attaches `uri_cold`; for `stage`, clears `hot_deleted`.
    pub async fn add_copy(
        &self,
        record_uuid: Uuid,
        file_id: Uuid,
        action: TransferAction,
        new_uri: &str,
    ) -> bool {
        let result = match action {
            TransferAction::Archive => files::set_cold_uri(&self.pool, file_id, new_uri).await,
            TransferAction::Stage => files::clear_hot_deleted(&self.pool, file_id).await,
        };
        if let Err(e) = result {
            tracing::error!(%file_id, error = %e, "add_copy: failed to update file");
            return false;
        }
        self.enqueue_reindex(record_uuid);
        true
    }

    /// Recomputes a record's availability histogram and applies the
    /// `requested` override (spec §4.9): `requested` if this record has an
    /// outstanding `submitted` stage Request or an unfinished stage
    /// Transfer. Shared by `reindex_entries` and the Request driver's
    /// Pass B (spec §4.8) so both see the same derivation.
    pub async fn derive_availability(&self, record: &RecordSnapshot) -> crate::availability::DerivedAvailability {
        let mut derived = crate::availability::derive_record_availability(record);

        let has_request = requests::has_submitted_for_record(&self.pool, record.uuid, TransferAction::Stage)
            .await
            .unwrap_or(false);
        let has_transfer = transfers::has_unfinished_for_record(&self.pool, record.uuid, TransferAction::Stage)
            .await
            .unwrap_or(false);
        crate::availability::apply_requested_override(&mut derived, has_request, has_transfer);
        derived
    }

    /// Drains the re-index queue FIFO, recomputing and persisting each
    /// record's availability and calling the external indexer. Retries an
    /// indexer failure once; a second failure is logged and the batch
    /// continues (spec §4.3).
    pub async fn reindex_entries(&self) {
        let queue: Vec<Uuid> = {
            let mut queue = self.reindex_queue.lock().expect("reindex queue poisoned");
            std::mem::take(&mut *queue)
        };

        for record_uuid in queue {
            let Some(record) = self.get_record(record_uuid).await else {
                tracing::error!(%record_uuid, "reindex: couldn't find that record");
                continue;
            };

            let derived = self.derive_availability(&record).await;
            if let Err(e) = self
                .record_store
                .commit_availability(record_uuid, derived.availability, derived.details)
                .await
            {
                tracing::error!(%record_uuid, error = %e, "reindex: failed to commit availability");
                continue;
            }

            if self.indexer.index(record_uuid).await.is_err() {
                tracing::warn!(%record_uuid, "reindex: indexer failed, retrying once");
                if let Err(e) = self.indexer.index(record_uuid).await {
                    tracing::error!(%record_uuid, error = e, "reindex: indexer failed twice, giving up");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::file_indices::FileIndex;
    use crate::model::files::Availability;
    use chrono::Utc;
    use std::collections::HashMap;

    fn file(key: &str) -> File {
        File {
            file_id: Uuid::new_v4(),
            record_uuid: Uuid::new_v4(),
            file_index_id: None,
            key: key.to_string(),
            uri_hot: format!("hot://X/{key}"),
            size: 10,
            checksum: "adler32:deadbeef".into(),
            uri_cold: None,
            hot_deleted: None,
        }
    }

    fn snapshot(files: Vec<File>) -> RecordSnapshot {
        RecordSnapshot {
            uuid: Uuid::new_v4(),
            recid: "1".into(),
            files,
            file_indices: Vec::<FileIndex>::new(),
            availability: Availability::Online,
            availability_details: HashMap::new(),
            distribution: None,
        }
    }

    struct NeverCalledStore;

    #[async_trait::async_trait]
    impl RecordStore for NeverCalledStore {
        async fn get_record(&self, _uuid: Uuid) -> Option<RecordSnapshot> {
            None
        }
        async fn commit_availability(
            &self,
            _uuid: Uuid,
            _availability: Availability,
            _details: HashMap<Availability, i64>,
        ) -> Result<(), crate::errors::Error> {
            Ok(())
        }
        async fn resolve_recid(&self, _recid: &str) -> Result<Uuid, crate::errors::Error> {
            Err(crate::errors::Error::NotFound)
        }
    }

    fn pure_catalog() -> Catalog {
        Catalog {
            pool: sqlx::PgPool::connect_lazy("postgres://unused/unused").unwrap(),
            record_store: Arc::new(NeverCalledStore),
            indexer: Arc::new(NullIndexer),
            reindex_queue: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn get_files_from_record_concatenates_direct_and_indexed_files() {
        let catalog = pure_catalog();
        let mut record = snapshot(vec![file("f1")]);
        record.file_indices.push(FileIndex {
            file_index_id: Uuid::new_v4(),
            record_uuid: record.uuid,
            key: "idx".into(),
            bucket: Uuid::new_v4(),
            description: None,
            files: vec![file("f2")],
        });
        let files = catalog.get_files_from_record(&record, None);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn negative_limit_drops_the_tail_scenario_s6() {
        let catalog = pure_catalog();
        let record = snapshot(vec![file("f1"), file("f2"), file("f3")]);
        let files = catalog.get_files_from_record(&record, Some(-1));
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].key, "f1");
        assert_eq!(files[1].key, "f2");
    }

    #[test]
    fn negative_limit_larger_than_files_yields_empty() {
        let catalog = pure_catalog();
        let record = snapshot(vec![file("f1"), file("f2")]);
        let files = catalog.get_files_from_record(&record, Some(-5));
        assert!(files.is_empty());
    }
}
