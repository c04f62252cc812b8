//! Personal product recommendations.

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::catalog::ProductSummary;
use crate::services::CatalogService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/recommendations", get(recommendations))
}

async fn recommendations(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Arc<Vec<ProductSummary>>>> {
    let products = CatalogService::new(state.pool(), state.catalog_cache())
        .recommendations(user.id)
        .await?;
    Ok(Json(products))
}
