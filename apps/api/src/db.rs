use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies the bundled schema. Every statement is `IF NOT EXISTS`, so this is safe on each boot.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    // A bare &str runs as a simple query, which accepts multiple statements.
    pool.execute(SCHEMA)
        .await
        .context("Failed to apply database schema")?;
    info!("Database schema is up to date");
    Ok(())
}
