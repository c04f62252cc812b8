//! Inventory ledger models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use techmart_core::{LedgerEntryId, LedgerEntryKind, OrderId, VariantId};

/// One row of the append-only ledger.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub variant_id: VariantId,
    pub kind: LedgerEntryKind,
    pub quantity: i32,
    pub order_id: Option<OrderId>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// A ledger row about to be appended.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry<'a> {
    pub variant_id: VariantId,
    pub kind: LedgerEntryKind,
    pub quantity: i32,
    pub order_id: Option<OrderId>,
    pub note: &'a str,
}

/// Stock position of a variant as read from `shop.variant_stock`.
#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub variant_id: VariantId,
    pub initial_stock: i32,
    pub sold_count: i32,
    pub available: i64,
}

/// Request body for `POST /admin/variants/{id}/restock`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restock {
    pub quantity: i32,
    pub note: Option<String>,
}
