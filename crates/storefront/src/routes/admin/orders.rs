//! Admin order management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use chrono::Utc;
use tracing::instrument;

use techmart_core::OrderId;

use crate::db::{OrderRepository, page_bounds};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Paginated;
use crate::models::order::{
    AdminOrderDetail, AdminOrderList, AdminOrderQuery, AdminOrderSummary, OrderStats,
    StatusChanged, StatusUpdate,
};
use crate::routes::orders::parse_status;
use crate::services::OrderService;
use crate::state::AppState;

const MAX_PAGE_SIZE: u32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(index))
        .route("/admin/orders/stats", get(stats))
        .route("/admin/orders/status/{status}", get(by_status))
        .route("/admin/orders/{id}", get(show))
        .route("/admin/orders/{id}/status", put(update_status))
}

#[instrument(skip(_admin, state))]
async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<AdminOrderQuery>,
) -> Result<Json<AdminOrderList>> {
    let (limit, offset) = page_bounds(query.page, query.limit, MAX_PAGE_SIZE);
    let since = query.range.since(Utc::now());
    let repo = OrderRepository::new(state.pool());

    let (items, total) = repo.admin_list(None, since, limit, offset).await?;
    let stats = repo.stats(since).await?;

    Ok(Json(AdminOrderList {
        page: Paginated::new(items, limit, offset, total),
        stats,
    }))
}

async fn stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<AdminOrderQuery>,
) -> Result<Json<OrderStats>> {
    let since = query.range.since(Utc::now());
    Ok(Json(OrderRepository::new(state.pool()).stats(since).await?))
}

async fn by_status(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(status): Path<String>,
    Query(query): Query<AdminOrderQuery>,
) -> Result<Json<Paginated<AdminOrderSummary>>> {
    let status = parse_status(&status)?;
    let (limit, offset) = page_bounds(query.page, query.limit, MAX_PAGE_SIZE);
    let since = query.range.since(Utc::now());
    let (items, total) = OrderRepository::new(state.pool())
        .admin_list(Some(status), since, limit, offset)
        .await?;
    Ok(Json(Paginated::new(items, limit, offset, total)))
}

async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<AdminOrderDetail>> {
    OrderRepository::new(state.pool())
        .admin_detail(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
}

#[instrument(skip(admin, state, body), fields(admin_id = %admin.id))]
async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<StatusChanged>> {
    let target = parse_status(&body.status)?;
    let outcome = OrderService::new(state.pool(), state.relay())
        .change_status(&admin, id, target, body.note.as_deref())
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
