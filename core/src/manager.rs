//! Per-record operation engine (spec §4.6): decides, file by file, whether a
//! transfer is needed, already scheduled, already present at the
//! destination (register-only path), or must be dispatched.

use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::model::files::File;
use crate::model::transfers::{self, NewTransfer, Transfer, TransferAction};
use crate::storage::{StorageRouter, VerifyFailure};

/// The three operations the CLI and the Request driver can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Archive,
    Stage,
    ClearHot,
}

/// Per-file result keyword, matching the CLI summary vocabulary of spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum OperationOutcome {
    Done,
    Scheduled,
    Error,
    Registered,
    Inconsistent,
    ToRegister,
    Dry,
    Created,
}

#[derive(Debug, Default)]
pub struct OperationSummary {
    pub outcomes: Vec<OperationOutcome>,
    pub transfers: Vec<Transfer>,
}

impl OperationSummary {
    pub fn count(&self, outcome: OperationOutcome) -> usize {
        self.outcomes.iter().filter(|o| **o == outcome).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(OperationOutcome::Error) > 0 || self.count(OperationOutcome::Inconsistent) > 0
    }

    /// True if `move_record` walked every file in `total_files` without
    /// breaking early on the `limit` cap. Lets callers tell "this record's
    /// necessary transfers are all issued" apart from "we just happened to
    /// create exactly as many transfers as our budget allowed".
    pub fn fully_processed(&self, total_files: usize) -> bool {
        self.outcomes.len() >= total_files
    }
}

pub struct Manager<'a> {
    pool: &'a sqlx::PgPool,
    catalog: &'a Catalog,
    storage: &'a StorageRouter,
}

impl<'a> Manager<'a> {
    pub fn new(pool: &'a sqlx::PgPool, catalog: &'a Catalog, storage: &'a StorageRouter) -> Self {
        Self {
            pool,
            catalog,
            storage,
        }
    }

    pub async fn do_operation(
        &self,
        operation: Operation,
        record_uuid: Uuid,
        limit: Option<i64>,
        register: bool,
        force: bool,
        dry: bool,
    ) -> OperationSummary {
        match operation {
            Operation::Archive => {
                self.move_record(record_uuid, limit, TransferAction::Archive, register, force, dry)
                    .await
            }
            Operation::Stage => {
                self.move_record(record_uuid, limit, TransferAction::Stage, register, force, dry)
                    .await
            }
            Operation::ClearHot => self.clear_hot(record_uuid, limit, dry).await,
        }
    }

    async fn move_record(
        &self,
        record_uuid: Uuid,
        limit: Option<i64>,
        action: TransferAction,
        register: bool,
        force: bool,
        dry: bool,
    ) -> OperationSummary {
        let mut summary = OperationSummary::default();
        let Some(record) = self.catalog.get_record(record_uuid).await else {
            return summary;
        };

        let files = self.catalog.get_files_from_record(&record, limit);
        let mut any_registered = false;

        for file in files {
            let (outcome, transfer) = self
                .move_file(record_uuid, &file, action, register, force, dry)
                .await;
            if outcome == OperationOutcome::Registered {
                any_registered = true;
            }
            summary.outcomes.push(outcome);
            if let Some(transfer) = transfer {
                summary.transfers.push(transfer);
            }

            if let Some(limit) = limit {
                if limit > 0 && summary.transfers.len() as i64 >= limit {
                    tracing::info!(%record_uuid, limit, "reached the transfer limit, stopping early");
                    break;
                }
            }
        }

        if any_registered {
            self.catalog.reindex_entries().await;
        }
        summary
    }

    async fn move_file(
        &self,
        record_uuid: Uuid,
        file: &File,
        action: TransferAction,
        register: bool,
        force: bool,
        dry: bool,
    ) -> (OperationOutcome, Option<Transfer>) {
        let already_in_target = match action {
            TransferAction::Archive => file.is_archived(),
            TransferAction::Stage => file.is_staged(),
        };
        if already_in_target {
            return (OperationOutcome::Done, None);
        }

        match transfers::is_scheduled(self.pool, file.file_id, action).await {
            Ok(true) => return (OperationOutcome::Scheduled, None),
            Ok(false) => {}
            Err(e) => {
                tracing::error!(file_id = %file.file_id, error = %e, "failed to check scheduled transfers");
                return (OperationOutcome::Error, None);
            }
        }

        let destination = match action {
            TransferAction::Archive => self.storage.find_url(TransferAction::Archive, &file.uri_hot),
            TransferAction::Stage => file
                .uri_cold
                .as_deref()
                .and_then(|src| self.storage.find_url(TransferAction::Stage, src)),
        };
        let Some((dest_uri, _location)) = destination else {
            tracing::error!(uri = %file.uri_hot, "no location matches this file's URI");
            return (OperationOutcome::Error, None);
        };

        if !force {
            match self
                .storage
                .verify_file(&dest_uri, file.size, &file.checksum)
                .await
            {
                Err(VerifyFailure::DoesNotExist) => {}
                Err(VerifyFailure::UnsupportedScheme) => return (OperationOutcome::Error, None),
                matches_or_mismatches => {
                    if !register {
                        return (OperationOutcome::ToRegister, None);
                    }
                    return match matches_or_mismatches {
                        Ok(()) => {
                            self.catalog
                                .add_copy(record_uuid, file.file_id, action, &dest_uri)
                                .await;
                            (OperationOutcome::Registered, None)
                        }
                        Err(_) => (OperationOutcome::Inconsistent, None),
                    };
                }
            }
        }

        if dry {
            return (OperationOutcome::Dry, None);
        }

        let dispatched = match action {
            TransferAction::Archive => self.storage.archive(file).await,
            TransferAction::Stage => self.storage.stage(file).await,
        };
        let Some(dispatched) = dispatched else {
            return (OperationOutcome::Error, None);
        };

        let new_transfer = NewTransfer {
            record_uuid,
            file_id: file.file_id,
            action: dispatched.action,
            new_filename: dispatched.new_filename,
            method: dispatched.method,
            method_id: dispatched.method_id,
            size: file.size,
        };
        match transfers::create(self.pool, new_transfer).await {
            Ok(transfer) => (OperationOutcome::Created, Some(transfer)),
            Err(e) => {
                tracing::error!(file_id = %file.file_id, error = %e, "failed to persist transfer");
                (OperationOutcome::Error, None)
            }
        }
    }

    /// Requires a file be both "archived" (cold copy exists) and "staged"
    /// (hot copy present) before deleting the hot copy and tagging it
    /// `hot_deleted`. `dry` is purely observational: no deletion, no tag
    /// mutation (resolved Open Question, spec §9/DESIGN.md).
    async fn clear_hot(&self, record_uuid: Uuid, limit: Option<i64>, dry: bool) -> OperationSummary {
        let mut summary = OperationSummary::default();
        let Some(record) = self.catalog.get_record(record_uuid).await else {
            return summary;
        };

        let files = self.catalog.get_files_from_record(&record, limit);
        let mut any_cleared = false;

        for file in files {
            if !file.is_archived() {
                tracing::info!(file_id = %file.file_id, "no cold copy exists yet, refusing to clear hot copy");
                summary.outcomes.push(OperationOutcome::Error);
                continue;
            }
            if !file.is_staged() {
                summary.outcomes.push(OperationOutcome::Done);
                continue;
            }
            if dry {
                summary.outcomes.push(OperationOutcome::Dry);
                continue;
            }
            self.storage.clear_hot(&file.uri_hot).await;
            self.catalog.clear_hot(record_uuid, file.file_id).await;
            any_cleared = true;
            summary.outcomes.push(OperationOutcome::Created);
        }

        if any_cleared {
            self.catalog.reindex_entries().await;
        }
        summary
    }
}
