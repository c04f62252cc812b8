//! Subcommand implementations.

pub mod inventory;
pub mod migrate;
pub mod seed;
pub mod user;

use sqlx::PgPool;
use techmart_storefront::config::{ConfigError, StorefrontConfig};
use techmart_storefront::db::{self, RepositoryError};
use techmart_storefront::services::AuthError;
use thiserror::Error;

/// Errors surfaced by any subcommand.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Account error: {0}")]
    Auth(#[from] AuthError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid seed data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Connect to the storefront database using the server's configuration.
pub async fn connect() -> Result<PgPool, CliError> {
    let config = StorefrontConfig::from_env()?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&config.database).await?)
}
