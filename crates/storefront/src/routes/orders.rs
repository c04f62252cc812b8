//! Customer order endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use tracing::instrument;

use techmart_core::{OrderId, OrderStatus, ProductId, ReviewId};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::order::{
    OrderListQuery, OrderStatusView, OrderWithItems, PlaceOrder, PlacedOrder, StatusChanged,
    StatusUpdate,
};
use crate::models::review::ReviewInput;
use crate::services::{OrderService, ReviewService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list).post(place))
        .route("/orders/{id}", get(show))
        .route("/orders/{id}/status", get(status).put(change_status))
        .route("/orders/{id}/cancel", post(cancel))
        .route(
            "/orders/{id}/products/{product_id}/review",
            post(review),
        )
}

#[derive(Debug, Serialize)]
struct Message {
    message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewCreated {
    message: &'static str,
    review_id: ReviewId,
}

/// Parse a status name from a request, answering 400 for unknown names.
pub(crate) fn parse_status(value: &str) -> Result<OrderStatus> {
    value
        .trim()
        .parse::<OrderStatus>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn order_not_found(id: OrderId) -> AppError {
    AppError::NotFound(format!("order {id} not found"))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let placed = OrderService::new(state.pool(), state.relay())
        .place_order(user.id, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderWithItems>>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id, status)
        .await?;
    Ok(Json(orders))
}

async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    let repo = OrderRepository::new(state.pool());
    let order = if user.is_admin() {
        repo.get(id).await?
    } else {
        repo.get_for_user(user.id, id).await?
    }
    .ok_or_else(|| order_not_found(id))?;
    let items = repo.lines(id).await?;
    Ok(Json(OrderWithItems::new(order, items)))
}

async fn status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderStatusView>> {
    let repo = OrderRepository::new(state.pool());
    let order = if user.is_admin() {
        repo.get(id).await?
    } else {
        repo.get_for_user(user.id, id).await?
    }
    .ok_or_else(|| order_not_found(id))?;
    Ok(Json(OrderStatusView::from(&order)))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
async fn change_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<StatusChanged>> {
    let target = parse_status(&body.status)?;
    let outcome = OrderService::new(state.pool(), state.relay())
        .change_status(&user, id, target, body.note.as_deref())
        .await?;
    Ok(Json(StatusChanged {
        message: if outcome.changed {
            "Order status updated"
        } else {
            "Order already has this status"
        },
        order_id: outcome.order_id,
        new_status: outcome.status,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Message>> {
    let outcome = OrderService::new(state.pool(), state.relay())
        .cancel(&user, id)
        .await?;
    Ok(Json(Message {
        message: if outcome.changed {
            "Order cancelled"
        } else {
            "Order was already cancelled"
        },
    }))
}

async fn review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((order_id, product_id)): Path<(OrderId, ProductId)>,
    Json(body): Json<ReviewInput>,
) -> Result<(StatusCode, Json<ReviewCreated>)> {
    let review_id = ReviewService::new(state.pool())
        .submit(user.id, order_id, product_id, &body)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ReviewCreated {
            message: "Review submitted",
            review_id,
        }),
    ))
}
