//! Database migration command.
//!
//! # Environment Variables
//!
//! - `MARIGOLD_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to `DATABASE_URL`)

use secrecy::SecretString;
use thiserror::Error;
use tracing::info;

use marigold_storefront::db;

/// Errors from the migrate command.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Run the storefront database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database URL is missing or the
/// migrations fail.
pub async fn storefront() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = database_url()?;

    info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running storefront migrations...");
    db::postgres::run_migrations(&pool).await?;

    info!("Storefront migrations complete!");
    Ok(())
}

pub(crate) fn database_url() -> Result<SecretString, MigrationError> {
    std::env::var("MARIGOLD_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("MARIGOLD_DATABASE_URL"))
}
