//! Inventory ledger maintenance.

use sqlx::PgPool;
use techmart_core::VariantId;
use techmart_storefront::db::InventoryRepository;

use super::CliError;

/// Rebuild `sold_count` on every variant from order-linked ledger rows.
pub async fn reconcile(pool: &PgPool) -> Result<(), CliError> {
    let fixed = InventoryRepository::new(pool).reconcile_sold_counts().await?;
    if fixed == 0 {
        tracing::info!("Sold counts already match the ledger");
    } else {
        tracing::warn!(variants = fixed, "Sold counts corrected from ledger");
    }
    Ok(())
}

/// Log the stock level and the latest ledger rows of one variant.
pub async fn show(pool: &PgPool, variant: i32) -> Result<(), CliError> {
    let repo = InventoryRepository::new(pool);
    let variant_id = VariantId::new(variant);

    let level = repo
        .stock_level(variant_id)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("variant {variant}")))?;

    tracing::info!(
        variant_id = %level.variant_id,
        initial_stock = level.initial_stock,
        sold_count = level.sold_count,
        available = level.available,
        "Stock level"
    );

    for entry in repo.ledger(variant_id, 10).await? {
        tracing::info!(
            kind = %entry.kind,
            quantity = entry.quantity,
            order_id = ?entry.order_id,
            note = %entry.note,
            at = %entry.created_at,
            "Ledger"
        );
    }
    Ok(())
}
