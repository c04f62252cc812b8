//! Cart repository.
//!
//! Each user has at most one cart, created on first add. Lines are keyed by
//! variant so adding the same variant twice merges quantities.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use techmart_core::{CartId, CartItemId, ProductId, UserId, VariantId};

use super::RepositoryError;
use crate::models::cart::CartLine;

const LINE_SELECT: &str = r"
    SELECT ci.id, v.product_id, p.name AS product_name, ci.variant_id,
           v.name AS variant_name, v.price, ci.quantity,
           v.price * ci.quantity AS line_total, s.available
    FROM shop.cartitems ci
    JOIN shop.carts c ON c.id = ci.cart_id
    JOIN shop.productvariants v ON v.id = ci.variant_id
    JOIN shop.products p ON p.id = v.product_id
    JOIN shop.variant_stock s ON s.variant_id = v.id
";

/// Empty the user's cart inside an existing transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn clear_for_user(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        DELETE FROM shop.cartitems ci
        USING shop.carts c
        WHERE c.id = ci.cart_id AND c.user_id = $1
        ",
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, CartLine>(&format!(
            "{LINE_SELECT} WHERE c.user_id = $1 ORDER BY ci.added_at, ci.id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(lines)
    }

    /// Add `quantity` of a variant, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not belong to an
    /// active product `product_id`, or `RepositoryError::Database` on failure.
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<CartItemId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM shop.productvariants v
                JOIN shop.products p ON p.id = v.product_id
                WHERE v.id = $1 AND v.product_id = $2 AND p.is_active
            )
            ",
        )
        .bind(variant_id)
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(RepositoryError::NotFound);
        }

        let cart_id: CartId = sqlx::query_scalar(
            r"
            INSERT INTO shop.carts (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            ",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let item_id = sqlx::query_scalar(
            r"
            INSERT INTO shop.cartitems (cart_id, product_id, variant_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, variant_id)
            DO UPDATE SET quantity = shop.cartitems.quantity + EXCLUDED.quantity
            RETURNING id
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(item_id)
    }

    /// Set a line's quantity. Returns `false` if the line is not in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.cartitems ci SET quantity = $3
            FROM shop.carts c
            WHERE c.id = ci.cart_id AND ci.id = $2 AND c.user_id = $1
            ",
        )
        .bind(user_id)
        .bind(item_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(&self, user_id: UserId, item_id: CartItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM shop.cartitems ci
            USING shop.carts c
            WHERE c.id = ci.cart_id AND ci.id = $2 AND c.user_id = $1
            ",
        )
        .bind(user_id)
        .bind(item_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        clear_for_user(&mut conn, user_id).await
    }

    /// Total number of units across all lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(ci.quantity), 0)::BIGINT
            FROM shop.cartitems ci
            JOIN shop.carts c ON c.id = ci.cart_id
            WHERE c.user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Cart value at current variant prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn total(&self, user_id: UserId) -> Result<Decimal, RepositoryError> {
        let total = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(v.price * ci.quantity), 0)
            FROM shop.cartitems ci
            JOIN shop.carts c ON c.id = ci.cart_id
            JOIN shop.productvariants v ON v.id = ci.variant_id
            WHERE c.user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(total)
    }
}
