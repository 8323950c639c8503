use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn run_migrations(connection_string: &str) -> Result<(), sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(connection_string)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(())
}

pub fn connect_lazy(connection_string: &str) -> PgPool {
    PgPoolOptions::new()
        .max_connections(10)
        .connect_lazy(connection_string)
        .expect("Failed to build lazy Postgres pool")
}
