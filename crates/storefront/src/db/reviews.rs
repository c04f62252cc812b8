//! Review repository.

use sqlx::{PgPool, Postgres, QueryBuilder};

use techmart_core::{OrderId, ProductId, ReviewId, UserId};

use super::RepositoryError;
use crate::models::review::{AdminReviewQuery, Review, ReviewInput};

const REVIEW_SELECT: &str = r"
    SELECT r.id, r.user_id, u.full_name AS reviewer_name, r.product_id,
           p.name AS product_name, r.order_id, r.rating, r.comment, r.is_verified,
           r.created_at, r.updated_at
    FROM shop.reviews r
    JOIN shop.users u ON u.id = r.user_id
    JOIN shop.products p ON p.id = r.product_id
";

#[derive(sqlx::FromRow)]
struct CountedReview {
    #[sqlx(flatten)]
    review: Review,
    total_count: i64,
}

fn split_counted(rows: Vec<CountedReview>) -> (Vec<Review>, i64) {
    let total = rows.first().map_or(0, |r| r.total_count);
    (rows.into_iter().map(|r| r.review).collect(), total)
}

pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(review)
    }

    /// Insert a review. One review per user and product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the
    /// product, or `RepositoryError::Database` on failure.
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        order_id: OrderId,
        input: &ReviewInput,
    ) -> Result<ReviewId, RepositoryError> {
        sqlx::query_scalar(
            r"
            INSERT INTO shop.reviews (user_id, product_id, order_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(order_id)
        .bind(input.rating)
        .bind(input.comment.trim())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "you have already reviewed this product"))
    }

    /// Reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Review>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, CountedReview>(&format!(
            r"
            SELECT q.*, COUNT(*) OVER () AS total_count FROM ({REVIEW_SELECT}
                WHERE r.product_id = $1) q
            ORDER BY q.created_at DESC, q.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(product_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;
        Ok(split_counted(rows))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_for_product(
        &self,
        product_id: ProductId,
        limit: i64,
    ) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC, r.id DESC LIMIT $2"
        ))
        .bind(product_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// Edit the author's own review. Editing clears verification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        user_id: UserId,
        id: ReviewId,
        input: &ReviewInput,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.reviews
            SET rating = $3, comment = $4, is_verified = FALSE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(input.rating)
        .bind(input.comment.trim())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the author's own review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, user_id: UserId, id: ReviewId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.reviews WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Filtered page of all reviews for moderation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn admin_list(
        &self,
        filter: &AdminReviewQuery,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Review>, i64), RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT q.*, COUNT(*) OVER () AS total_count FROM (");
        qb.push(REVIEW_SELECT);
        qb.push(" WHERE TRUE");
        if let Some(verified) = filter.verified {
            qb.push(" AND r.is_verified = ").push_bind(verified);
        }
        if let Some(rating) = filter.rating {
            qb.push(" AND r.rating = ").push_bind(rating);
        }
        if let Some(product) = filter.product {
            qb.push(" AND r.product_id = ").push_bind(product);
        }
        qb.push(") q ORDER BY q.created_at DESC, q.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb
            .build_query_as::<CountedReview>()
            .fetch_all(self.pool)
            .await?;
        Ok(split_counted(rows))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_verified(&self, id: ReviewId, verified: bool) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE shop.reviews SET is_verified = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(verified)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn admin_delete(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
