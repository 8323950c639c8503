use tokio::net::TcpListener;

use cold_storage::{configuration::get_configuration, database, startup::run};
use common::telemtry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber("cold-storage".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().expect("Failed to read configuration.");
    database::run_migrations(&configuration.database.connection_string())
        .await
        .expect("Failed to run migrations");

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );

    let connection_pool = database::connect_lazy(&configuration.database.connection_string());
    tracing::info!("Starting server on {}", address);
    let listener = TcpListener::bind(address).await?;

    match run(listener, connection_pool, configuration).await {
        Ok(server) => {
            server.await.unwrap();
        }
        Err(e) => {
            tracing::error!("Server failed to start: {}", e);
        }
    }

    Ok(())
}
