//! Review submission rules.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use techmart_core::{OrderId, OrderStatus, ProductId, ReviewId, UserId};

use crate::db::{OrderRepository, RepositoryError, ReviewRepository};
use crate::models::review::ReviewInput;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{0}")]
    Invalid(String),

    #[error("order not found")]
    OrderNotFound,

    #[error("this order does not contain the product")]
    ProductNotInOrder,

    #[error("only delivered orders can be reviewed (current status: {0})")]
    NotDelivered(OrderStatus),

    #[error("you have already reviewed this product")]
    AlreadyReviewed,

    #[error("review not found")]
    NotFound,

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ReviewError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => Self::AlreadyReviewed,
            other => Self::Repository(other),
        }
    }
}

pub struct ReviewService<'a> {
    orders: OrderRepository<'a>,
    reviews: ReviewRepository<'a>,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            reviews: ReviewRepository::new(pool),
        }
    }

    /// Review a product from one of the caller's delivered orders.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError` if the input is invalid, the order is not the
    /// caller's, is not delivered, lacks the product, or the product was
    /// already reviewed.
    #[instrument(skip(self, input), fields(user_id = %user_id, order_id = %order_id, product_id = %product_id))]
    pub async fn submit(
        &self,
        user_id: UserId,
        order_id: OrderId,
        product_id: ProductId,
        input: &ReviewInput,
    ) -> Result<ReviewId, ReviewError> {
        input.validate().map_err(ReviewError::Invalid)?;

        let (status, contains) = self
            .orders
            .status_if_contains(user_id, order_id, product_id)
            .await?
            .ok_or(ReviewError::OrderNotFound)?;
        if !contains {
            return Err(ReviewError::ProductNotInOrder);
        }
        if status != OrderStatus::Delivered {
            return Err(ReviewError::NotDelivered(status));
        }

        let id = self
            .reviews
            .create(user_id, product_id, order_id, input)
            .await?;
        tracing::info!(review_id = %id, "Review submitted");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `ReviewError::NotFound` unless the caller wrote the review.
    pub async fn edit(
        &self,
        user_id: UserId,
        id: ReviewId,
        input: &ReviewInput,
    ) -> Result<(), ReviewError> {
        input.validate().map_err(ReviewError::Invalid)?;
        if self.reviews.update(user_id, id, input).await? {
            Ok(())
        } else {
            Err(ReviewError::NotFound)
        }
    }

    /// # Errors
    ///
    /// Returns `ReviewError::NotFound` unless the caller wrote the review.
    pub async fn delete(&self, user_id: UserId, id: ReviewId) -> Result<(), ReviewError> {
        if self.reviews.delete(user_id, id).await? {
            Ok(())
        } else {
            Err(ReviewError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_already_reviewed() {
        let err = ReviewError::from(RepositoryError::Conflict("dup".to_string()));
        assert!(matches!(err, ReviewError::AlreadyReviewed));
        let err = ReviewError::from(RepositoryError::NotFound);
        assert!(matches!(err, ReviewError::Repository(RepositoryError::NotFound)));
    }
}
