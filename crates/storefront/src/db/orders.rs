//! Order persistence.
//!
//! Write helpers take `&mut PgConnection` and are composed into a single
//! transaction by `services::orders`. Reads go through [`OrderRepository`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use techmart_core::{
    AddressId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId, VariantId,
};

use super::RepositoryError;
use crate::models::order::{
    AdminOrderDetail, AdminOrderSummary, Customer, Order, OrderLine, OrderStats, OrderWithItems,
    Payment,
};

const ORDER_COLUMNS: &str =
    "id, user_id, address_id, total, status, note, created_at, updated_at";

const LINE_SELECT: &str = r"
    SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name,
           oi.variant_id, v.name AS variant_name, oi.quantity, oi.price,
           oi.price * oi.quantity AS subtotal
    FROM shop.orderitems oi
    JOIN shop.products p ON p.id = oi.product_id
    JOIN shop.productvariants v ON v.id = oi.variant_id
";

const ADMIN_SUMMARY_SELECT: &str = r"
    SELECT o.id, o.user_id, u.full_name AS customer_name, u.email AS customer_email,
           o.total, o.status,
           (SELECT COUNT(*) FROM shop.orderitems oi WHERE oi.order_id = o.id) AS item_count,
           o.created_at, o.updated_at,
           COUNT(*) OVER () AS total_count
    FROM shop.orders o
    JOIN shop.users u ON u.id = o.user_id
";

/// Order row held under `FOR UPDATE`.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct LockedOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
}

// =============================================================================
// Transaction building blocks
// =============================================================================

/// Insert a `pending` order with a zero total.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    user_id: UserId,
    address_id: AddressId,
) -> Result<OrderId, RepositoryError> {
    let id = sqlx::query_scalar(
        r"
        INSERT INTO shop.orders (user_id, address_id, total, status)
        VALUES ($1, $2, 0, 'pending')
        RETURNING id
        ",
    )
    .bind(user_id)
    .bind(address_id)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Insert a line item priced at `unit_price`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_line(
    conn: &mut PgConnection,
    order_id: OrderId,
    product_id: ProductId,
    variant_id: VariantId,
    quantity: i32,
    unit_price: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO shop.orderitems (order_id, product_id, variant_id, quantity, price)
        VALUES ($1, $2, $3, $4, $5)
        ",
    )
    .bind(order_id)
    .bind(product_id)
    .bind(variant_id)
    .bind(quantity)
    .bind(unit_price)
    .execute(conn)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_total(
    conn: &mut PgConnection,
    order_id: OrderId,
    total: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE shop.orders SET total = $2, updated_at = NOW() WHERE id = $1")
        .bind(order_id)
        .bind(total)
        .execute(conn)
        .await?;
    Ok(())
}

/// Create the order's payment record in `pending` state.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_payment(
    conn: &mut PgConnection,
    order_id: OrderId,
    method: PaymentMethod,
    amount: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO shop.payments (order_id, method, status, amount)
        VALUES ($1, $2, 'pending', $3)
        ",
    )
    .bind(order_id)
    .bind(method)
    .bind(amount)
    .execute(conn)
    .await?;
    Ok(())
}

/// Lock an order row for a status change.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_order(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Option<LockedOrder>, RepositoryError> {
    let order = sqlx::query_as::<_, LockedOrder>(
        "SELECT id, user_id, status FROM shop.orders WHERE id = $1 FOR UPDATE",
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Write a new status. A `note` replaces the stored admin note; `None` keeps it.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn update_status(
    conn: &mut PgConnection,
    order_id: OrderId,
    status: OrderStatus,
    note: Option<&str>,
) -> Result<DateTime<Utc>, RepositoryError> {
    let updated_at = sqlx::query_scalar(
        r"
        UPDATE shop.orders
        SET status = $2, note = COALESCE($3, note), updated_at = NOW()
        WHERE id = $1
        RETURNING updated_at
        ",
    )
    .bind(order_id)
    .bind(status)
    .bind(note)
    .fetch_one(conn)
    .await?;
    Ok(updated_at)
}

/// Upsert the payment record to `status`, stamping `paid_at` on payment.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails.
pub async fn sync_payment(
    conn: &mut PgConnection,
    order_id: OrderId,
    status: PaymentStatus,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO shop.payments (order_id, status, amount, paid_at)
        SELECT id, $2, total, CASE WHEN $2 = 'paid'::shop.payment_status THEN NOW() END
        FROM shop.orders WHERE id = $1
        ON CONFLICT (order_id) DO UPDATE
        SET status = EXCLUDED.status,
            paid_at = COALESCE(EXCLUDED.paid_at, shop.payments.paid_at),
            updated_at = NOW()
        ",
    )
    .bind(order_id)
    .bind(status)
    .execute(conn)
    .await?;
    Ok(())
}

// =============================================================================
// Reads
// =============================================================================

#[derive(sqlx::FromRow)]
struct CountedAdminSummary {
    #[sqlx(flatten)]
    summary: AdminOrderSummary,
    total_count: i64,
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// An order of `user_id`, or `None` if it is missing or someone else's.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, OrderLine>(&format!(
            "{LINE_SELECT} WHERE oi.order_id = $1 ORDER BY oi.id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(lines)
    }

    /// The user's orders, newest first, each with its line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM shop.orders
            WHERE user_id = $1 AND ($2::shop.order_status IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user_id)
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let lines = sqlx::query_as::<_, OrderLine>(&format!(
            "{LINE_SELECT} WHERE oi.order_id = ANY($1) ORDER BY oi.order_id, oi.id"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for line in lines {
            by_order.entry(line.order_id).or_default().push(line);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems::new(order, items)
            })
            .collect())
    }

    /// Status of an order the user owns that contains `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_if_contains(
        &self,
        user_id: UserId,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<Option<(OrderStatus, bool)>, RepositoryError> {
        let row: Option<(OrderStatus, bool)> = sqlx::query_as(
            r"
            SELECT o.status,
                   EXISTS (SELECT 1 FROM shop.orderitems oi
                           WHERE oi.order_id = o.id AND oi.product_id = $3)
            FROM shop.orders o
            WHERE o.id = $1 AND o.user_id = $2
            ",
        )
        .bind(order_id)
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Page of all orders, optionally limited by status and creation time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn admin_list(
        &self,
        status: Option<OrderStatus>,
        since: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AdminOrderSummary>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, CountedAdminSummary>(&format!(
            r"
            {ADMIN_SUMMARY_SELECT}
            WHERE ($1::shop.order_status IS NULL OR o.status = $1)
              AND ($2::TIMESTAMPTZ IS NULL OR o.created_at >= $2)
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(status)
        .bind(since)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map_or(0, |r| r.total_count);
        Ok((rows.into_iter().map(|r| r.summary).collect(), total))
    }

    /// Per-status counts and revenue, optionally since a point in time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self, since: Option<DateTime<Utc>>) -> Result<OrderStats, RepositoryError> {
        let stats = sqlx::query_as::<_, OrderStats>(
            r"
            SELECT COUNT(*) AS total_orders,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'processing') AS processing,
                   COUNT(*) FILTER (WHERE status = 'shipped') AS shipped,
                   COUNT(*) FILTER (WHERE status = 'delivered') AS delivered,
                   COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
                   COALESCE(SUM(total) FILTER (WHERE status IN ('shipped', 'delivered')), 0)
                       AS revenue
            FROM shop.orders
            WHERE $1::TIMESTAMPTZ IS NULL OR created_at >= $1
            ",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }

    /// Full order view for the admin detail page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn admin_detail(
        &self,
        id: OrderId,
    ) -> Result<Option<AdminOrderDetail>, RepositoryError> {
        let Some(order) = self.get(id).await? else {
            return Ok(None);
        };

        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, full_name, email, phone FROM shop.users WHERE id = $1",
        )
        .bind(order.user_id)
        .fetch_one(self.pool)
        .await?;

        let shipping_address = super::AddressRepository::new(self.pool)
            .get(order.address_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!("order {id} has no shipping address"))
            })?;

        let payment = sqlx::query_as::<_, Payment>(
            "SELECT id, order_id, method, status, amount, paid_at FROM shop.payments WHERE order_id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let items = self.lines(id).await?;

        Ok(Some(AdminOrderDetail {
            status_description: order.status.description(),
            allowed_statuses: order.status.next_statuses(),
            order,
            customer,
            shipping_address,
            payment,
            items,
        }))
    }
}
