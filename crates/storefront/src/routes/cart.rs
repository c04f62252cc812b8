//! Shopping cart.
//!
//! Prices are read live from the variants; the price a customer pays is
//! captured only when the order is placed.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use techmart_core::{CartItemId, VariantId};

use crate::db::{CartRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::cart::{AddToCart, CartSummary, UpdateCartItem};
use crate::services::orders::MAX_LINE_QUANTITY;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(show))
        .route("/cart/add", post(add))
        .route("/cart/update", put(update))
        .route("/cart/remove/{id}", delete(remove))
        .route("/cart/clear", delete(clear))
        .route("/cart/count", get(count))
        .route("/cart/total", get(total))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Added {
    message: &'static str,
    cart_item_id: CartItemId,
    variant_id: VariantId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartCount {
    total_items: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartTotal {
    total_value: Decimal,
}

fn check_quantity(quantity: i32) -> Result<()> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "quantity must be between 1 and {MAX_LINE_QUANTITY}"
        )))
    }
}

fn item_not_found() -> AppError {
    AppError::NotFound("cart item not found".to_string())
}

async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartSummary>> {
    let items = CartRepository::new(state.pool()).items(user.id).await?;
    Ok(Json(CartSummary::new(items)))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddToCart>,
) -> Result<(StatusCode, Json<Added>)> {
    check_quantity(body.quantity)?;
    let cart_item_id = CartRepository::new(state.pool())
        .add_item(user.id, body.product_id, body.variant_id, body.quantity)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!(
                "variant {} of product {} not found",
                body.variant_id, body.product_id
            )),
            other => other.into(),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(Added {
            message: "Added to cart",
            cart_item_id,
            variant_id: body.variant_id,
        }),
    ))
}

async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<UpdateCartItem>,
) -> Result<Json<CartSummary>> {
    check_quantity(body.quantity)?;
    let repo = CartRepository::new(state.pool());
    if !repo
        .update_quantity(user.id, body.cart_item_id, body.quantity)
        .await?
    {
        return Err(item_not_found());
    }
    Ok(Json(CartSummary::new(repo.items(user.id).await?)))
}

async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CartItemId>,
) -> Result<StatusCode> {
    if CartRepository::new(state.pool()).remove(user.id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(item_not_found())
    }
}

async fn clear(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<StatusCode> {
    CartRepository::new(state.pool()).clear(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartCount>> {
    let total_items = CartRepository::new(state.pool()).count(user.id).await?;
    Ok(Json(CartCount { total_items }))
}

async fn total(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartTotal>> {
    let total_value = CartRepository::new(state.pool()).total(user.id).await?;
    Ok(Json(CartTotal { total_value }))
}
