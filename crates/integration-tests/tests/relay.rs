//! Status changes reach exactly the WebSocket connections watching the order.
//!
//! Run with: `DATABASE_URL=... cargo test -p techmart-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use sqlx::PgPool;
use techmart_core::{OrderId, OrderStatus};
use techmart_integration_tests::{address, admin, customer, line, order, variant};
use techmart_storefront::notify::OrderRelay;
use techmart_storefront::notify::protocol::ServerMessage;
use techmart_storefront::services::OrderService;

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_status_change_reaches_only_subscribers(pool: PgPool) {
    let relay = OrderRelay::new();
    let service = OrderService::new(&pool, &relay);
    let user = customer(&pool, "watcher@techmart.test").await;
    let staff = admin(&pool).await;
    let address_id = address(&pool, &user).await;
    let (product, variant_id) = variant(&pool, 450_000, 10).await;

    let placed = service
        .place_order(user.id, &order(address_id, vec![line(product, variant_id, 1)]))
        .await
        .unwrap();

    let (watcher, mut watcher_rx) = relay.register();
    let (elsewhere, mut elsewhere_rx) = relay.register();
    let (_idle, mut idle_rx) = relay.register();
    assert!(relay.subscribe(watcher, placed.order_id));
    assert!(relay.subscribe(elsewhere, OrderId::new(placed.order_id.as_i32() + 1)));

    service
        .change_status(&staff, placed.order_id, OrderStatus::Processing, None)
        .await
        .unwrap();

    let ServerMessage::OrderUpdate {
        order_id,
        new_status,
        ..
    } = watcher_rx.try_recv().unwrap();
    assert_eq!(order_id, placed.order_id);
    assert_eq!(new_status, OrderStatus::Processing);

    assert!(elsewhere_rx.try_recv().is_err());
    assert!(idle_rx.try_recv().is_err());
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_noop_and_late_subscribers_get_nothing(pool: PgPool) {
    let relay = OrderRelay::new();
    let service = OrderService::new(&pool, &relay);
    let user = customer(&pool, "late-watcher@techmart.test").await;
    let staff = admin(&pool).await;
    let address_id = address(&pool, &user).await;
    let (product, variant_id) = variant(&pool, 450_000, 10).await;

    let placed = service
        .place_order(user.id, &order(address_id, vec![line(product, variant_id, 1)]))
        .await
        .unwrap();
    service
        .change_status(&staff, placed.order_id, OrderStatus::Processing, None)
        .await
        .unwrap();

    let (late, mut late_rx) = relay.register();
    relay.subscribe(late, placed.order_id);
    assert!(late_rx.try_recv().is_err());

    let outcome = service
        .change_status(&staff, placed.order_id, OrderStatus::Processing, None)
        .await
        .unwrap();
    assert!(!outcome.changed);
    assert!(late_rx.try_recv().is_err());
}
