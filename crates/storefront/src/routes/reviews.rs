//! Editing and deleting one's own reviews.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::put,
};

use techmart_core::ReviewId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::review::ReviewInput;
use crate::services::ReviewService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/reviews/{id}", put(update).delete(remove))
}

async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ReviewId>,
    Json(body): Json<ReviewInput>,
) -> Result<StatusCode> {
    ReviewService::new(state.pool())
        .edit(user.id, id, &body)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    ReviewService::new(state.pool()).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
