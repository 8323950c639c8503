use axum::{routing::IntoMakeService, serve::Serve, Router};
use tokio::net::TcpListener;

use crate::backend::{BackendRegistry, FilesystemBackend, WideAreaBackend};
use crate::configuration::Settings;
use crate::handlers::app;
use crate::mail::SmtpMailer;
use crate::services::workers;
use crate::Services;
use sqlx::PgPool;
use std::sync::Arc;

fn backends(config: &Settings) -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(Arc::new(FilesystemBackend::new()));
    registry.register(Arc::new(WideAreaBackend::new(config.wide_area_backend.clone())));
    registry
}

pub async fn run(
    listener: TcpListener,
    db_pool: PgPool,
    config: Settings,
) -> Result<Serve<IntoMakeService<Router>, Router>, Box<dyn std::error::Error + Send>> {
    let registry = backends(&config);
    let mailer = Arc::new(SmtpMailer::new(&config.mail));
    let services = Services::new(db_pool, config, registry).with_mailer(mailer);

    // Periodic workers, grounded on `qarax::vm_monitor::start_vm_monitor`'s
    // spawn-and-loop shape (spec §4.7/§4.8/§9).
    tokio::spawn(workers::start_transfer_poller(services.clone()));
    tokio::spawn(workers::start_request_driver(services.clone()));

    let app = app(services);
    let server = axum::serve(listener, app.into_make_service());
    Ok(server)
}
