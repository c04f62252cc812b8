//! Inventory ledger access.
//!
//! Stock moves only by appending to `shop.inventory_transactions`. Available
//! stock is always read through the `shop.variant_stock` view, and every
//! writer locks the variant row first so concurrent check-then-append
//! sequences on one variant are serialised.
//!
//! `productvariants.sold_count` is a projection of order exports minus order
//! restores. It is maintained in the same transaction as the ledger row that
//! moves it and can be rebuilt with [`InventoryRepository::reconcile_sold_counts`].

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use techmart_core::{LedgerEntryKind, OrderId, ProductId, VariantId};

use super::RepositoryError;
use crate::models::inventory::{LedgerEntry, NewLedgerEntry, StockLevel};

const LEDGER_COLUMNS: &str = "id, variant_id, kind, quantity, order_id, note, created_at";

/// A variant row held under `FOR UPDATE`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub price: rust_decimal::Decimal,
}

/// Lock variant rows in ascending id order and return them keyed by id.
///
/// Ids that do not exist, or whose product is inactive, are absent from
/// the result.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_variants(
    conn: &mut PgConnection,
    ids: &[VariantId],
) -> Result<HashMap<VariantId, LockedVariant>, RepositoryError> {
    let rows = sqlx::query_as::<_, LockedVariant>(
        r"
        SELECT v.id, v.product_id, v.price
        FROM shop.productvariants v
        JOIN shop.products p ON p.id = v.product_id
        WHERE v.id = ANY($1) AND p.is_active
        ORDER BY v.id
        FOR UPDATE OF v
        ",
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

/// Available stock for each of `ids`, read from `shop.variant_stock`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn available_stock(
    conn: &mut PgConnection,
    ids: &[VariantId],
) -> Result<HashMap<VariantId, i64>, RepositoryError> {
    let rows: Vec<(VariantId, i64)> = sqlx::query_as(
        "SELECT variant_id, available FROM shop.variant_stock WHERE variant_id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Append one ledger row.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn append(
    conn: &mut PgConnection,
    entry: NewLedgerEntry<'_>,
) -> Result<LedgerEntry, RepositoryError> {
    let row = sqlx::query_as::<_, LedgerEntry>(&format!(
        r"
        INSERT INTO shop.inventory_transactions (variant_id, kind, quantity, order_id, note)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {LEDGER_COLUMNS}
        "
    ))
    .bind(entry.variant_id)
    .bind(entry.kind)
    .bind(entry.quantity)
    .bind(entry.order_id)
    .bind(entry.note)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Record `quantity` units of a variant as sold to `order_id`: bump the
/// `sold_count` projection and append the matching `export` row.
///
/// The caller must hold the variant's row lock and have checked stock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if either write fails.
pub async fn record_sale(
    conn: &mut PgConnection,
    variant_id: VariantId,
    quantity: i32,
    order_id: OrderId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE shop.productvariants SET sold_count = sold_count + $2 WHERE id = $1")
        .bind(variant_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

    append(
        conn,
        NewLedgerEntry {
            variant_id,
            kind: LedgerEntryKind::Export,
            quantity,
            order_id: Some(order_id),
            note: &format!("Order #{order_id}"),
        },
    )
    .await?;

    Ok(())
}

/// Return every unit of an order to stock.
///
/// Appends one `import` row per variant in the order (quantities summed
/// across lines) and lowers `sold_count` by the same amount, floored at zero.
/// Returns the restored quantities.
///
/// Callers decide *whether* to restock; this function must only run once per
/// order, which the status state machine guarantees by never leaving
/// `cancelled`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any write fails.
#[instrument(skip(conn, note))]
pub async fn restock_order(
    conn: &mut PgConnection,
    order_id: OrderId,
    note: &str,
) -> Result<Vec<(VariantId, i32)>, RepositoryError> {
    let lines: Vec<(VariantId, i64)> = sqlx::query_as(
        r"
        SELECT variant_id, SUM(quantity)::BIGINT
        FROM shop.orderitems
        WHERE order_id = $1
        GROUP BY variant_id
        ORDER BY variant_id
        ",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut restored = Vec::with_capacity(lines.len());
    for (variant_id, quantity) in lines {
        let quantity = i32::try_from(quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "order {order_id} has an impossible quantity for variant {variant_id}"
            ))
        })?;

        sqlx::query(
            "UPDATE shop.productvariants SET sold_count = GREATEST(sold_count - $2, 0) WHERE id = $1",
        )
        .bind(variant_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        append(
            &mut *conn,
            NewLedgerEntry {
                variant_id,
                kind: LedgerEntryKind::Import,
                quantity,
                order_id: Some(order_id),
                note,
            },
        )
        .await?;

        restored.push((variant_id, quantity));
    }

    tracing::info!(order_id = %order_id, variants = restored.len(), "Order restocked");
    Ok(restored)
}

/// Pool-level inventory operations for admin tooling.
pub struct InventoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock_level(
        &self,
        variant_id: VariantId,
    ) -> Result<Option<StockLevel>, RepositoryError> {
        let level = sqlx::query_as::<_, StockLevel>(
            r"
            SELECT variant_id, initial_stock, sold_count, available
            FROM shop.variant_stock WHERE variant_id = $1
            ",
        )
        .bind(variant_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(level)
    }

    /// Most recent ledger rows for a variant, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ledger(
        &self,
        variant_id: VariantId,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, LedgerEntry>(&format!(
            r"
            SELECT {LEDGER_COLUMNS} FROM shop.inventory_transactions
            WHERE variant_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "
        ))
        .bind(variant_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Receive stock from a supplier: append an `import` row that is not tied
    /// to any order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist.
    #[instrument(skip(self, note))]
    pub async fn restock(
        &self,
        variant_id: VariantId,
        quantity: i32,
        note: &str,
    ) -> Result<StockLevel, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if lock_variants(&mut tx, &[variant_id]).await?.is_empty() {
            return Err(RepositoryError::NotFound);
        }

        append(
            &mut tx,
            NewLedgerEntry {
                variant_id,
                kind: LedgerEntryKind::Import,
                quantity,
                order_id: None,
                note,
            },
        )
        .await?;

        let level = sqlx::query_as::<_, StockLevel>(
            r"
            SELECT variant_id, initial_stock, sold_count, available
            FROM shop.variant_stock WHERE variant_id = $1
            ",
        )
        .bind(variant_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(level)
    }

    /// Rebuild `sold_count` from order-linked ledger rows. Returns how many
    /// variants were out of step.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip(self))]
    pub async fn reconcile_sold_counts(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            WITH net AS (
                SELECT v.id,
                       GREATEST(COALESCE(SUM(
                           CASE t.kind WHEN 'export' THEN t.quantity ELSE -t.quantity END
                       ) FILTER (WHERE t.order_id IS NOT NULL), 0), 0)::INT AS sold
                FROM shop.productvariants v
                LEFT JOIN shop.inventory_transactions t ON t.variant_id = v.id
                GROUP BY v.id
            )
            UPDATE shop.productvariants pv
            SET sold_count = net.sold
            FROM net
            WHERE pv.id = net.id AND pv.sold_count <> net.sold
            ",
        )
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
