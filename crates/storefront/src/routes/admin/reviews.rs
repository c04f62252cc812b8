//! Review moderation.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
};

use techmart_core::ReviewId;

use crate::db::{ReviewRepository, page_bounds};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Paginated;
use crate::models::review::{AdminReviewQuery, Review, VerifyReview};
use crate::state::AppState;

const MAX_PAGE_SIZE: u32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/reviews", get(index))
        .route("/admin/reviews/{id}/verify", put(verify))
        .route("/admin/reviews/{id}", delete(remove))
}

fn review_not_found(id: ReviewId) -> AppError {
    AppError::NotFound(format!("review {id} not found"))
}

async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<AdminReviewQuery>,
) -> Result<Json<Paginated<Review>>> {
    let (limit, offset) = page_bounds(query.page, query.limit, MAX_PAGE_SIZE);
    let (items, total) = ReviewRepository::new(state.pool())
        .admin_list(&query, limit, offset)
        .await?;
    Ok(Json(Paginated::new(items, limit, offset, total)))
}

async fn verify(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    Json(body): Json<VerifyReview>,
) -> Result<Json<Review>> {
    let repo = ReviewRepository::new(state.pool());
    if !repo.set_verified(id, body.is_verified).await? {
        return Err(review_not_found(id));
    }
    tracing::info!(admin_id = %admin.id, review_id = %id, verified = body.is_verified, "Review moderated");
    repo.get(id)
        .await?
        .map(Json)
        .ok_or_else(|| review_not_found(id))
}

async fn remove(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    if ReviewRepository::new(state.pool()).admin_delete(id).await? {
        tracing::info!(admin_id = %admin.id, review_id = %id, "Review deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(review_not_found(id))
    }
}
