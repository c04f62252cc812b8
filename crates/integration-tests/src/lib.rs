//! Integration tests for Techmart.
//!
//! # Running Tests
//!
//! ```bash
//! # Database-backed service tests (each test gets a fresh database)
//! DATABASE_URL=postgres://localhost/techmart_test \
//!     cargo test -p techmart-integration-tests -- --ignored
//!
//! # HTTP tests against a running storefront
//! TECHMART_BASE_URL=http://localhost:3000 \
//!     cargo test -p techmart-integration-tests --test http_api -- --ignored
//! ```
//!
//! The helpers below build the minimum rows a scenario needs.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;
use techmart_core::{AddressId, Email, Price, ProductId, UserRole, VariantId};
use techmart_storefront::db::users::NewUser;
use techmart_storefront::db::{AddressRepository, CatalogRepository, InventoryRepository, UserRepository};
use techmart_storefront::models::CurrentUser;
use techmart_storefront::models::address::NewAddress;
use techmart_storefront::models::catalog::{NewProduct, NewVariant};
use techmart_storefront::models::order::{OrderLineRequest, PlaceOrder};

/// Insert a customer account and return its session identity.
pub async fn customer(pool: &PgPool, email: &str) -> CurrentUser {
    let email = Email::parse(email).unwrap();
    let user = UserRepository::new(pool)
        .create(NewUser {
            full_name: "Test Customer",
            email: &email,
            phone: None,
            password_hash: "not-a-real-hash",
        })
        .await
        .unwrap();
    CurrentUser::from(&user)
}

/// Insert an admin account.
pub async fn admin(pool: &PgPool) -> CurrentUser {
    let mut user = customer(pool, "admin@techmart.test").await;
    UserRepository::new(pool)
        .set_role(&user.email, UserRole::Admin)
        .await
        .unwrap();
    user.role = UserRole::Admin;
    user
}

/// Insert a shipping address owned by `user`.
pub async fn address(pool: &PgPool, user: &CurrentUser) -> AddressId {
    AddressRepository::new(pool)
        .create(
            user.id,
            &NewAddress {
                recipient_name: user.full_name.clone(),
                phone: "0900000000".to_string(),
                line1: "1 Test Street".to_string(),
                line2: None,
                city: "Ho Chi Minh City".to_string(),
                province: None,
                postal_code: None,
                country: None,
                is_default: true,
            },
        )
        .await
        .unwrap()
        .id
}

/// Insert a single-variant product with `stock` units at `price`.
pub async fn variant(pool: &PgPool, price: i64, stock: i32) -> (ProductId, VariantId) {
    let repo = CatalogRepository::new(pool);
    let product_id = repo
        .create_product(&NewProduct {
            name: "Test Gadget".to_string(),
            description: None,
            category_id: None,
            brand_id: None,
            variants: vec![NewVariant {
                name: "Default".to_string(),
                sku: None,
                price: Price::new(Decimal::from(price)).unwrap(),
                initial_stock: stock,
            }],
        })
        .await
        .unwrap();
    let variant_id = repo.variants(product_id).await.unwrap().first().unwrap().id;
    (product_id, variant_id)
}

#[must_use]
pub const fn line(product_id: ProductId, variant_id: VariantId, quantity: i32) -> OrderLineRequest {
    OrderLineRequest {
        product_id,
        variant_id,
        quantity,
    }
}

#[must_use]
pub fn order(address_id: AddressId, items: Vec<OrderLineRequest>) -> PlaceOrder {
    PlaceOrder {
        address_id,
        items,
        payment_method: None,
    }
}

/// Current available stock read from the ledger view.
pub async fn available(pool: &PgPool, variant_id: VariantId) -> i64 {
    InventoryRepository::new(pool)
        .stock_level(variant_id)
        .await
        .unwrap()
        .unwrap()
        .available
}

/// Units currently counted as sold on the variant row.
pub async fn sold_count(pool: &PgPool, variant_id: VariantId) -> i32 {
    InventoryRepository::new(pool)
        .stock_level(variant_id)
        .await
        .unwrap()
        .unwrap()
        .sold_count
}

/// Run a `SELECT COUNT(*)` style query.
pub async fn count(pool: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}
