//! Database operations for the storefront `PostgreSQL` database.
//!
//! # Schema: `shop`
//!
//! - `users`, `addresses` - Accounts and shipping addresses
//! - `categories`, `brands`, `products`, `productvariants` - Catalog
//! - `inventory_transactions` - Append-only stock ledger
//! - `orders`, `orderitems`, `payments` - Orders
//! - `carts`, `cartitems` - One cart per user
//! - `reviews`, `product_views` - Reviews and browsing history
//!
//! The `shop.variant_stock` view is the only place available stock is
//! computed.
//!
//! Functions that take `&mut PgConnection` are building blocks for a caller's
//! transaction; repositories that hold a `&PgPool` run standalone statements.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p techmart-cli -- migrate
//! ```

pub mod addresses;
pub mod carts;
pub mod catalog;
pub mod inventory;
pub mod orders;
pub mod reviews;
pub mod users;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use carts::CartRepository;
pub use catalog::CatalogRepository;
pub use inventory::InventoryRepository;
pub use orders::OrderRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;

use crate::config::DatabaseConfig;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to [`RepositoryError::Conflict`].
    pub(crate) fn from_constraint(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    pool_options(config)
        .connect(config.url.expose_secret())
        .await
}

/// Create a pool that connects on first use.
///
/// Used by tests that exercise routing without a live database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL cannot be parsed.
pub fn create_lazy_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    pool_options(config).connect_lazy(config.url.expose_secret())
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(2.min(config.max_connections))
        .acquire_timeout(config.acquire_timeout)
}

/// Convert 1-based page and page size into `(limit, offset)`.
#[must_use]
pub fn page_bounds(page: Option<u32>, limit: Option<u32>, max_limit: u32) -> (i64, i64) {
    let limit = limit.unwrap_or(10).clamp(1, max_limit);
    let page = page.unwrap_or(1).max(1);
    (i64::from(limit), i64::from(page - 1) * i64::from(limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds_defaults() {
        assert_eq!(page_bounds(None, None, 100), (10, 0));
    }

    #[test]
    fn test_page_bounds_clamps() {
        assert_eq!(page_bounds(Some(0), Some(0), 100), (1, 0));
        assert_eq!(page_bounds(Some(3), Some(500), 50), (50, 100));
    }
}
