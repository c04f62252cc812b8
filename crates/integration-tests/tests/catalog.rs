//! Cart and admin catalog edits against a real database.
//!
//! Run with: `DATABASE_URL=... cargo test -p techmart-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;
use techmart_core::{Price, VariantId};
use techmart_integration_tests::{address, customer, line, order, variant};
use techmart_storefront::db::{CartRepository, CatalogRepository, OrderRepository, RepositoryError};
use techmart_storefront::models::catalog::{ProductUpdate, VariantEdit};
use techmart_storefront::notify::OrderRelay;
use techmart_storefront::services::{OrderError, OrderService};

fn price_edit(variant_id: VariantId, price: i64) -> ProductUpdate {
    ProductUpdate {
        variants: vec![VariantEdit {
            id: variant_id,
            name: None,
            sku: None,
            price: Some(Price::new(Decimal::from(price)).unwrap()),
        }],
        ..ProductUpdate::default()
    }
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cart_add_merges_same_variant(pool: PgPool) {
    let user = customer(&pool, "shopper@techmart.test").await;
    let (product, variant_id) = variant(&pool, 80_000, 10).await;

    let cart = CartRepository::new(&pool);
    let first = cart.add_item(user.id, product, variant_id, 1).await.unwrap();
    let second = cart.add_item(user.id, product, variant_id, 2).await.unwrap();
    assert_eq!(first, second);

    let items = cart.items(user.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_id, product);
    assert_eq!(items[0].quantity, 3);
    assert_eq!(items[0].line_total, Decimal::from(240_000));
    assert_eq!(cart.total(user.id).await.unwrap(), Decimal::from(240_000));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_price_edit_keeps_placed_order_price(pool: PgPool) {
    let relay = OrderRelay::new();
    let user = customer(&pool, "early@techmart.test").await;
    let address_id = address(&pool, &user).await;
    let (product, variant_id) = variant(&pool, 1_000_000, 5).await;

    let placed = OrderService::new(&pool, &relay)
        .place_order(user.id, &order(address_id, vec![line(product, variant_id, 2)]))
        .await
        .unwrap();

    let catalog = CatalogRepository::new(&pool);
    catalog
        .update_product(product, &price_edit(variant_id, 1_400_000))
        .await
        .unwrap();
    assert_eq!(
        catalog.variant(variant_id).await.unwrap().unwrap().price,
        Decimal::from(1_400_000)
    );

    let orders = OrderRepository::new(&pool);
    let lines = orders.lines(placed.order_id).await.unwrap();
    assert_eq!(lines[0].price, Decimal::from(1_000_000));
    assert_eq!(lines[0].subtotal, Decimal::from(2_000_000));
    let stored = orders.get(placed.order_id).await.unwrap().unwrap();
    assert_eq!(stored.total, Decimal::from(2_000_000));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_update_rejects_variant_of_other_product(pool: PgPool) {
    let (product, _) = variant(&pool, 100_000, 1).await;
    let (_, foreign_variant) = variant(&pool, 200_000, 1).await;

    let err = CatalogRepository::new(&pool)
        .update_product(product, &price_edit(foreign_variant, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound));

    let unchanged = CatalogRepository::new(&pool)
        .variant(foreign_variant)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.price, Decimal::from(200_000));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_deactivated_product_cannot_be_bought(pool: PgPool) {
    let relay = OrderRelay::new();
    let user = customer(&pool, "late-buyer@techmart.test").await;
    let address_id = address(&pool, &user).await;
    let (product, variant_id) = variant(&pool, 300_000, 5).await;

    let catalog = CatalogRepository::new(&pool);
    assert!(catalog.deactivate(product).await.unwrap());
    assert!(catalog.product(product).await.unwrap().is_none());

    let err = CartRepository::new(&pool)
        .add_item(user.id, product, variant_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound));

    let err = OrderService::new(&pool, &relay)
        .place_order(user.id, &order(address_id, vec![line(product, variant_id, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::VariantNotFound(id) if id == variant_id));
}
