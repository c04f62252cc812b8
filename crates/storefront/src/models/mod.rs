//! Domain models for the storefront.
//!
//! Most read models map one-to-one onto a query and derive both
//! `sqlx::FromRow` and `Serialize`; request bodies derive `Deserialize` and
//! carry their own `validate` methods.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod inventory;
pub mod order;
pub mod review;
pub mod session;
pub mod user;

pub use session::{CurrentUser, keys as session_keys};

use serde::Serialize;

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    #[must_use]
    pub fn new(items: Vec<T>, limit: i64, offset: i64, total: i64) -> Self {
        let limit = limit.max(1);
        Self {
            items,
            page: offset / limit + 1,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginated_page_math() {
        let page = Paginated::new(vec![1, 2, 3], 10, 20, 23);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);

        let empty: Paginated<i32> = Paginated::new(Vec::new(), 10, 0, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
