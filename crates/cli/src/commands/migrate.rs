//! Database migration command.
//!
//! Applies `crates/storefront/migrations/` and creates the
//! tower-sessions table used by the storefront session layer.

use sqlx::PgPool;
use tower_sessions_sqlx_store::PostgresStore;

use super::CliError;

/// Run all migrations.
pub async fn run(pool: &PgPool) -> Result<(), CliError> {
    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(pool).await?;

    tracing::info!("Running session store migrations...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
