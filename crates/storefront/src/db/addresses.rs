//! Address repository.

use sqlx::{PgConnection, PgPool};

use techmart_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::address::{Address, NewAddress};

const ADDRESS_COLUMNS: &str = "id, user_id, recipient_name, phone, line1, line2, city, \
                               province, postal_code, country, is_default, created_at";

pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Addresses of a user, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM shop.addresses
             WHERE user_id = $1
             ORDER BY is_default DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(addresses)
    }

    /// Add an address. A new default address demotes the previous one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if address.is_default {
            sqlx::query("UPDATE shop.addresses SET is_default = FALSE WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let created = sqlx::query_as::<_, Address>(&format!(
            r"
            INSERT INTO shop.addresses
                (user_id, recipient_name, phone, line1, line2, city, province,
                 postal_code, country, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, 'VN'), $10)
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(address.recipient_name.trim())
        .bind(address.phone.trim())
        .bind(address.line1.trim())
        .bind(address.line2.as_deref())
        .bind(address.city.trim())
        .bind(address.province.as_deref())
        .bind(address.postal_code.as_deref())
        .bind(address.country.as_deref())
        .bind(address.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Delete one of the user's addresses. Returns `false` if it does not
    /// exist or belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an order still ships to it.
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_constraint(e, "address is used by an existing order")
            })?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM shop.addresses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(address)
    }
}

/// Whether `address_id` exists and belongs to `user_id`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn is_owned_by(
    conn: &mut PgConnection,
    address_id: AddressId,
    user_id: UserId,
) -> Result<bool, RepositoryError> {
    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM shop.addresses WHERE id = $1 AND user_id = $2)",
    )
    .bind(address_id)
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(owned)
}
