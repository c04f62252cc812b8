//! User management commands.

use sqlx::PgPool;
use techmart_core::{Email, UserRole};
use techmart_storefront::db::UserRepository;

use super::CliError;

/// Promote an existing user to admin.
pub async fn promote(pool: &PgPool, email: &str) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(|_| CliError::InvalidEmail(email.to_owned()))?;

    if !UserRepository::new(pool)
        .set_role(&email, UserRole::Admin)
        .await?
    {
        return Err(CliError::NotFound(format!("user {email}")));
    }

    tracing::info!(email = %email, "User promoted to admin");
    Ok(())
}
