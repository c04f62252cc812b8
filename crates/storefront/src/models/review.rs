//! Product reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use techmart_core::{OrderId, ProductId, ReviewId, UserId};

/// Longest accepted review comment, in characters.
pub const MAX_COMMENT_LENGTH: usize = 2000;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub reviewer_name: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub order_id: OrderId,
    pub rating: i16,
    pub comment: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or editing a review.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

impl ReviewInput {
    /// # Errors
    ///
    /// Returns a message if the rating is outside 1..=5 or the comment is too long.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.rating) {
            return Err("rating must be between 1 and 5".to_string());
        }
        if self.comment.chars().count() > MAX_COMMENT_LENGTH {
            return Err(format!(
                "comment must be at most {MAX_COMMENT_LENGTH} characters"
            ));
        }
        Ok(())
    }
}

/// Query string for `GET /admin/reviews`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReviewQuery {
    pub verified: Option<bool>,
    pub rating: Option<i16>,
    pub product: Option<ProductId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Request body for `PUT /admin/reviews/{id}/verify`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReview {
    pub is_verified: bool,
}

/// Query string for review pagination.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}
