//! Product management and stock.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use techmart_core::{ProductId, VariantId};

use crate::db::{CatalogRepository, InventoryRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::catalog::{NewProduct, ProductUpdate};
use crate::models::inventory::{LedgerEntry, Restock, StockLevel};
use crate::state::AppState;

/// Ledger rows returned when no limit is given.
const DEFAULT_LEDGER_LIMIT: i64 = 50;
const MAX_LEDGER_LIMIT: i64 = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/products", post(create_product))
        .route(
            "/admin/products/{id}",
            put(update_product).delete(deactivate_product),
        )
        .route("/admin/variants/{id}/stock", get(stock))
        .route("/admin/variants/{id}/ledger", get(ledger))
        .route("/admin/variants/{id}/restock", post(restock))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductCreated {
    message: &'static str,
    product_id: ProductId,
}

#[derive(Debug, Serialize)]
struct Message {
    message: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct LedgerQuery {
    limit: Option<i64>,
}

fn variant_not_found(id: VariantId) -> AppError {
    AppError::NotFound(format!("variant {id} not found"))
}

#[instrument(skip(admin, state, body), fields(admin_id = %admin.id))]
async fn create_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<ProductCreated>)> {
    body.validate().map_err(AppError::BadRequest)?;
    let product_id = CatalogRepository::new(state.pool())
        .create_product(&body)
        .await?;
    state.catalog_cache().invalidate();
    Ok((
        StatusCode::CREATED,
        Json(ProductCreated {
            message: "Product created",
            product_id,
        }),
    ))
}

#[instrument(skip(admin, state, body), fields(admin_id = %admin.id))]
async fn update_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductUpdate>,
) -> Result<Json<Message>> {
    body.validate().map_err(AppError::BadRequest)?;
    CatalogRepository::new(state.pool())
        .update_product(id, &body)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                AppError::NotFound(format!("product {id} or one of its variants not found"))
            }
            other => other.into(),
        })?;
    state.catalog_cache().invalidate();
    Ok(Json(Message {
        message: "Product updated",
    }))
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
async fn deactivate_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Message>> {
    if !CatalogRepository::new(state.pool()).deactivate(id).await? {
        return Err(AppError::NotFound(format!("product {id} not found")));
    }
    state.catalog_cache().invalidate();
    tracing::info!(product_id = %id, "Product deactivated");
    Ok(Json(Message {
        message: "Product removed from the catalog",
    }))
}

async fn stock(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
) -> Result<Json<StockLevel>> {
    InventoryRepository::new(state.pool())
        .stock_level(id)
        .await?
        .map(Json)
        .ok_or_else(|| variant_not_found(id))
}

async fn ledger(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Vec<LedgerEntry>>> {
    let repo = InventoryRepository::new(state.pool());
    if repo.stock_level(id).await?.is_none() {
        return Err(variant_not_found(id));
    }
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEDGER_LIMIT)
        .clamp(1, MAX_LEDGER_LIMIT);
    Ok(Json(repo.ledger(id, limit).await?))
}

#[instrument(skip(admin, state, body), fields(admin_id = %admin.id))]
async fn restock(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
    Json(body): Json<Restock>,
) -> Result<Json<StockLevel>> {
    if body.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be positive".to_string(),
        ));
    }
    let note = body
        .note
        .as_deref()
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map_or_else(|| format!("Restock by admin #{}", admin.id), String::from);

    let level = InventoryRepository::new(state.pool())
        .restock(id, body.quantity, &note)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => variant_not_found(id),
            other => other.into(),
        })?;
    Ok(Json(level))
}
