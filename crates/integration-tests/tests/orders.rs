//! Order placement and lifecycle against a real database.
//!
//! Each test receives a freshly migrated database from `sqlx::test`.
//! Run with: `DATABASE_URL=... cargo test -p techmart-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;
use techmart_core::{AddressId, OrderId, OrderStatus, PaymentStatus};
use techmart_integration_tests::{
    address, admin, available, count, customer, line, order, sold_count, variant,
};
use techmart_storefront::db::{CartRepository, OrderRepository};
use techmart_storefront::models::review::ReviewInput;
use techmart_storefront::notify::OrderRelay;
use techmart_storefront::services::reviews::ReviewError;
use techmart_storefront::services::{OrderError, OrderService, ReviewService};

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_total_is_sum_of_lines(pool: PgPool) {
    let relay = OrderRelay::new();
    let user = customer(&pool, "buyer@techmart.test").await;
    let address_id = address(&pool, &user).await;
    let (phone, phone_variant) = variant(&pool, 1_500_000, 10).await;
    let (case, case_variant) = variant(&pool, 250_000, 10).await;

    let placed = OrderService::new(&pool, &relay)
        .place_order(
            user.id,
            &order(
                address_id,
                vec![line(phone, phone_variant, 2), line(case, case_variant, 3)],
            ),
        )
        .await
        .unwrap();

    assert_eq!(placed.total, Decimal::from(3_750_000));

    let repo = OrderRepository::new(&pool);
    let stored = repo.get(placed.order_id).await.unwrap().unwrap();
    let lines = repo.lines(placed.order_id).await.unwrap();
    let line_sum: Decimal = lines.iter().map(|l| l.subtotal).sum();
    assert_eq!(stored.total, line_sum);
    assert_eq!(stored.status, OrderStatus::Pending);

    assert_eq!(available(&pool, phone_variant).await, 8);
    assert_eq!(available(&pool, case_variant).await, 7);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM shop.inventory_transactions WHERE kind = 'export'").await,
        2
    );
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_repeated_variant_lines_are_merged(pool: PgPool) {
    let relay = OrderRelay::new();
    let user = customer(&pool, "merge@techmart.test").await;
    let address_id = address(&pool, &user).await;
    let (product, variant_id) = variant(&pool, 100_000, 3).await;

    let err = OrderService::new(&pool, &relay)
        .place_order(
            user.id,
            &order(
                address_id,
                vec![line(product, variant_id, 2), line(product, variant_id, 2)],
            ),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OrderError::InsufficientStock {
            requested: 4,
            available: 3,
            ..
        }
    ));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_insufficient_stock_writes_nothing(pool: PgPool) {
    let relay = OrderRelay::new();
    let user = customer(&pool, "greedy@techmart.test").await;
    let address_id = address(&pool, &user).await;
    let (plenty, plenty_variant) = variant(&pool, 100_000, 50).await;
    let (scarce, scarce_variant) = variant(&pool, 900_000, 1).await;

    let err = OrderService::new(&pool, &relay)
        .place_order(
            user.id,
            &order(
                address_id,
                vec![line(plenty, plenty_variant, 5), line(scarce, scarce_variant, 2)],
            ),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::InsufficientStock { variant_id, .. } if variant_id == scarce_variant));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM shop.orders").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM shop.orderitems").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM shop.payments").await, 0);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM shop.inventory_transactions").await,
        0
    );
    assert_eq!(available(&pool, plenty_variant).await, 50);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_last_units_then_sold_out_then_restored(pool: PgPool) {
    let relay = OrderRelay::new();
    let service = OrderService::new(&pool, &relay);
    let first = customer(&pool, "first@techmart.test").await;
    let second = customer(&pool, "second@techmart.test").await;
    let first_address = address(&pool, &first).await;
    let second_address = address(&pool, &second).await;
    let (product, variant_id) = variant(&pool, 500_000, 2).await;

    let placed = service
        .place_order(first.id, &order(first_address, vec![line(product, variant_id, 2)]))
        .await
        .unwrap();
    assert_eq!(available(&pool, variant_id).await, 0);

    let err = service
        .place_order(second.id, &order(second_address, vec![line(product, variant_id, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InsufficientStock {
            requested: 1,
            available: 0,
            ..
        }
    ));

    service.cancel(&first, placed.order_id).await.unwrap();
    assert_eq!(available(&pool, variant_id).await, 2);

    service
        .place_order(second.id, &order(second_address, vec![line(product, variant_id, 1)]))
        .await
        .unwrap();
    assert_eq!(available(&pool, variant_id).await, 1);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_double_cancel_restocks_once(pool: PgPool) {
    let relay = OrderRelay::new();
    let service = OrderService::new(&pool, &relay);
    let user = customer(&pool, "flaky@techmart.test").await;
    let staff = admin(&pool).await;
    let address_id = address(&pool, &user).await;
    let (product, variant_id) = variant(&pool, 300_000, 5).await;

    let placed = service
        .place_order(user.id, &order(address_id, vec![line(product, variant_id, 3)]))
        .await
        .unwrap();

    let first = service.cancel(&user, placed.order_id).await.unwrap();
    assert!(first.changed);

    let second = service
        .change_status(&staff, placed.order_id, OrderStatus::Cancelled, None)
        .await
        .unwrap();
    assert!(!second.changed);

    assert_eq!(available(&pool, variant_id).await, 5);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM shop.inventory_transactions WHERE kind = 'import'").await,
        1
    );
    let voided: PaymentStatus = sqlx::query_scalar("SELECT status FROM shop.payments WHERE order_id = $1")
        .bind(placed.order_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(voided, PaymentStatus::Voided);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_customer_cannot_cancel_after_processing(pool: PgPool) {
    let relay = OrderRelay::new();
    let service = OrderService::new(&pool, &relay);
    let user = customer(&pool, "late@techmart.test").await;
    let staff = admin(&pool).await;
    let address_id = address(&pool, &user).await;
    let (product, variant_id) = variant(&pool, 300_000, 5).await;

    let placed = service
        .place_order(user.id, &order(address_id, vec![line(product, variant_id, 1)]))
        .await
        .unwrap();
    service
        .change_status(&staff, placed.order_id, OrderStatus::Processing, None)
        .await
        .unwrap();

    let err = service.cancel(&user, placed.order_id).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::CancelNotAllowed(OrderStatus::Processing)
    ));

    let stranger = customer(&pool, "stranger@techmart.test").await;
    let err = service.cancel(&stranger, placed.order_id).await.unwrap_err();
    assert!(matches!(err, OrderError::Forbidden));

    assert_eq!(available(&pool, variant_id).await, 4);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_terminal_status_rejects_transitions(pool: PgPool) {
    let relay = OrderRelay::new();
    let service = OrderService::new(&pool, &relay);
    let user = customer(&pool, "done@techmart.test").await;
    let staff = admin(&pool).await;
    let address_id = address(&pool, &user).await;
    let (product, variant_id) = variant(&pool, 300_000, 5).await;

    let placed = service
        .place_order(user.id, &order(address_id, vec![line(product, variant_id, 1)]))
        .await
        .unwrap();
    for status in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        service
            .change_status(&staff, placed.order_id, status, None)
            .await
            .unwrap();
    }

    let paid: PaymentStatus = sqlx::query_scalar("SELECT status FROM shop.payments WHERE order_id = $1")
        .bind(placed.order_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(paid, PaymentStatus::Paid);

    let err = service
        .change_status(&staff, placed.order_id, OrderStatus::Cancelled, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition(_)));
    assert_eq!(available(&pool, variant_id).await, 4);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cart_is_cleared_by_order(pool: PgPool) {
    let relay = OrderRelay::new();
    let user = customer(&pool, "cart@techmart.test").await;
    let address_id = address(&pool, &user).await;
    let (product, variant_id) = variant(&pool, 120_000, 10).await;

    let cart = CartRepository::new(&pool);
    cart.add_item(user.id, product, variant_id, 2).await.unwrap();
    cart.add_item(user.id, product, variant_id, 1).await.unwrap();
    assert_eq!(cart.count(user.id).await.unwrap(), 3);

    OrderService::new(&pool, &relay)
        .place_order(user.id, &order(address_id, vec![line(product, variant_id, 3)]))
        .await
        .unwrap();

    assert_eq!(cart.count(user.id).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_review_requires_delivery(pool: PgPool) {
    let relay = OrderRelay::new();
    let service = OrderService::new(&pool, &relay);
    let reviews = ReviewService::new(&pool);
    let user = customer(&pool, "critic@techmart.test").await;
    let staff = admin(&pool).await;
    let address_id = address(&pool, &user).await;
    let (product, variant_id) = variant(&pool, 700_000, 5).await;
    let input = ReviewInput {
        rating: 5,
        comment: "Great battery life".to_string(),
    };

    let placed = service
        .place_order(user.id, &order(address_id, vec![line(product, variant_id, 1)]))
        .await
        .unwrap();

    let err = reviews
        .submit(user.id, placed.order_id, product, &input)
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::NotDelivered(OrderStatus::Pending)));

    for status in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        service
            .change_status(&staff, placed.order_id, status, None)
            .await
            .unwrap();
    }

    reviews
        .submit(user.id, placed.order_id, product, &input)
        .await
        .unwrap();
    let err = reviews
        .submit(user.id, placed.order_id, product, &input)
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::AlreadyReviewed));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_orders_for_last_units(pool: PgPool) {
    let relay = OrderRelay::new();
    let first = customer(&pool, "fast@techmart.test").await;
    let second = customer(&pool, "faster@techmart.test").await;
    let (product, variant_id) = variant(&pool, 900_000, 2).await;
    let first_order = order(address(&pool, &first).await, vec![line(product, variant_id, 2)]);
    let second_order = order(address(&pool, &second).await, vec![line(product, variant_id, 2)]);

    let first_service = OrderService::new(&pool, &relay);
    let second_service = OrderService::new(&pool, &relay);
    let (a, b) = tokio::join!(
        first_service.place_order(first.id, &first_order),
        second_service.place_order(second.id, &second_order),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(OrderError::InsufficientStock {
            requested: 2,
            available: 0,
            ..
        })
    )));
    assert_eq!(available(&pool, variant_id).await, 0);
    assert_eq!(sold_count(&pool, variant_id).await, 2);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM shop.orders").await, 1);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cancel_restores_sold_count_and_references_order(pool: PgPool) {
    let relay = OrderRelay::new();
    let service = OrderService::new(&pool, &relay);
    let user = customer(&pool, "undo@techmart.test").await;
    let staff = admin(&pool).await;
    let address_id = address(&pool, &user).await;
    let (product, variant_id) = variant(&pool, 450_000, 2).await;
    assert_eq!(sold_count(&pool, variant_id).await, 0);

    let placed = service
        .place_order(user.id, &order(address_id, vec![line(product, variant_id, 2)]))
        .await
        .unwrap();
    assert_eq!(sold_count(&pool, variant_id).await, 2);

    service.cancel(&user, placed.order_id).await.unwrap();
    assert_eq!(sold_count(&pool, variant_id).await, 0);

    service
        .change_status(&staff, placed.order_id, OrderStatus::Cancelled, None)
        .await
        .unwrap();
    assert_eq!(sold_count(&pool, variant_id).await, 0);
    assert_eq!(available(&pool, variant_id).await, 2);

    let imports: Vec<(i32, Option<OrderId>)> = sqlx::query_as(
        "SELECT quantity, order_id FROM shop.inventory_transactions WHERE kind = 'import' AND variant_id = $1",
    )
    .bind(variant_id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(imports, vec![(2, Some(placed.order_id))]);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_foreign_address_is_rejected(pool: PgPool) {
    let relay = OrderRelay::new();
    let service = OrderService::new(&pool, &relay);
    let owner = customer(&pool, "owner@techmart.test").await;
    let other = customer(&pool, "other@techmart.test").await;
    let owners_address = address(&pool, &owner).await;
    let (product, variant_id) = variant(&pool, 200_000, 5).await;

    let err = service
        .place_order(other.id, &order(owners_address, vec![line(product, variant_id, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::AddressNotFound));

    let err = service
        .place_order(
            other.id,
            &order(AddressId::new(9_999), vec![line(product, variant_id, 1)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::AddressNotFound));

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM shop.orders").await, 0);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM shop.inventory_transactions WHERE kind = 'export'").await,
        0
    );
    assert_eq!(available(&pool, variant_id).await, 5);
}
