pub mod availability;
pub mod backend;
pub mod catalog;
pub mod configuration;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod mail;
pub mod manager;
pub mod model;
pub mod services;
pub mod startup;
pub mod storage;

use std::sync::Arc;

use sqlx::PgPool;

use crate::backend::BackendRegistry;
use crate::catalog::{Catalog, Indexer, NullIndexer};
use crate::configuration::Settings;
use crate::mail::{Mailer, NullMailer};
use crate::model::records::{PostgresRecordStore, RecordStore};
use crate::storage::StorageRouter;

/// Explicit context threaded into every worker entry point and every HTTP
/// handler (via `axum::Extension<Services>`), generalizing `qarax::App`
/// (spec §9 "Global state").
#[derive(Clone)]
pub struct Services {
    pool: Arc<PgPool>,
    record_store: Arc<dyn RecordStore>,
    indexer: Arc<dyn Indexer>,
    mailer: Arc<dyn Mailer>,
    backends: Arc<BackendRegistry>,
    config: Arc<Settings>,
}

impl Services {
    pub fn new(pool: PgPool, config: Settings, backends: BackendRegistry) -> Self {
        let pool = Arc::new(pool);
        Self {
            record_store: Arc::new(PostgresRecordStore::new((*pool).clone())),
            indexer: Arc::new(NullIndexer),
            mailer: Arc::new(NullMailer),
            backends: Arc::new(backends),
            pool,
            config: Arc::new(config),
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn Indexer>) -> Self {
        self.indexer = indexer;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn pool_arc(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }

    pub fn mailer(&self) -> Arc<dyn Mailer> {
        self.mailer.clone()
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    /// Resolves an external record identifier to the internal UUID the rest
    /// of the core operates on (spec §1: the persistent-identifier store is
    /// an external collaborator, `resolve(recid) -> uuid`).
    pub async fn resolve_recid(&self, recid: &str) -> Result<uuid::Uuid, crate::errors::Error> {
        self.record_store.resolve_recid(recid).await
    }

    /// Builds a fresh `Catalog`, never shared across workers/handlers (spec
    /// §9 "Cyclic ownership"/"Global state").
    pub fn catalog(&self) -> Catalog {
        Catalog::new((*self.pool).clone(), self.record_store.clone(), self.indexer.clone())
    }

    pub fn storage(&self, locations: Vec<crate::model::locations::Location>) -> StorageRouter {
        StorageRouter::new(locations, (*self.backends).clone())
    }
}
