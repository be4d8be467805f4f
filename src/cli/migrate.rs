use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub struct MigrationOpts {
    pub database_url: String,
}

pub async fn run_migrations(opts: MigrationOpts) -> anyhow::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&opts.database_url)
        .await
        .context("Failed to connect to the database for migrations.")?;

    sqlx::migrate!("./migrations-sqlx")
        .run(&pool)
        .await
        .context("Failed to run database migrations.")?;

    info!("Database migrations complete.");

    Ok(())
}
