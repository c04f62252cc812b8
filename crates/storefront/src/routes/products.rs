//! Public catalog: product listing, detail, categories and brands.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use tracing::instrument;

use techmart_core::ProductId;

use crate::db::{CatalogRepository, ReviewRepository, page_bounds};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Paginated;
use crate::models::catalog::{Brand, Category, ProductDetail, ProductQuery, ProductSummary, Variant};
use crate::models::review::{PageQuery, Review};
use crate::services::CatalogService;
use crate::state::AppState;

/// Largest page size for product listings.
const MAX_PAGE_SIZE: u32 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(index))
        .route("/products/bestsellers", get(bestsellers))
        .route("/products/{id}", get(show))
        .route("/products/{id}/variants", get(variants))
        .route("/products/{id}/reviews", get(reviews))
        .route("/products/{id}/view", post(record_view))
        .route("/categories", get(categories))
        .route("/brands", get(brands))
}

fn product_not_found(id: ProductId) -> AppError {
    AppError::NotFound(format!("product {id} not found"))
}

#[instrument(skip(state))]
async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Paginated<ProductSummary>>> {
    let (limit, offset) = page_bounds(query.page, query.limit, MAX_PAGE_SIZE);
    let (items, total) = CatalogRepository::new(state.pool())
        .list_products(&query, limit, offset)
        .await?;
    Ok(Json(Paginated::new(items, limit, offset, total)))
}

async fn bestsellers(State(state): State<AppState>) -> Result<Json<Arc<Vec<ProductSummary>>>> {
    let products = CatalogService::new(state.pool(), state.catalog_cache())
        .bestsellers()
        .await?;
    Ok(Json(products))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    CatalogService::new(state.pool(), state.catalog_cache())
        .product_detail(id)
        .await?
        .map(Json)
        .ok_or_else(|| product_not_found(id))
}

async fn variants(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<Variant>>> {
    let repo = CatalogRepository::new(state.pool());
    if repo.product(id).await?.is_none() {
        return Err(product_not_found(id));
    }
    Ok(Json(repo.variants(id).await?))
}

async fn reviews(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<Review>>> {
    let (limit, offset) = page_bounds(query.page, query.limit, MAX_PAGE_SIZE);
    let (items, total) = ReviewRepository::new(state.pool())
        .list_for_product(id, limit, offset)
        .await?;
    Ok(Json(Paginated::new(items, limit, offset, total)))
}

async fn record_view(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    if CatalogRepository::new(state.pool())
        .record_view(user.id, id)
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(product_not_found(id))
    }
}

async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(CatalogRepository::new(state.pool()).categories().await?))
}

async fn brands(State(state): State<AppState>) -> Result<Json<Vec<Brand>>> {
    Ok(Json(CatalogRepository::new(state.pool()).brands().await?))
}
