//! Order placement and status changes.
//!
//! Every mutation here runs in one transaction: the stock check, order rows,
//! ledger rows, `sold_count` projection, payment and cart cleanup commit
//! together or not at all. Relay broadcasts happen only after commit.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use techmart_core::{
    AddressId, InvalidTransition, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId,
    StatusChange, UserId, VariantId, line_total,
};

use crate::db::{RepositoryError, addresses, carts, inventory, orders};
use crate::models::order::{OrderLineRequest, PlaceOrder, PlacedOrder};
use crate::models::session::CurrentUser;
use crate::notify::OrderRelay;

/// Largest quantity accepted for a single variant in one order.
pub const MAX_LINE_QUANTITY: i32 = 1000;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order must contain at least one item")]
    EmptyOrder,

    #[error("quantity for variant {variant_id} must be between 1 and {max}", max = MAX_LINE_QUANTITY)]
    InvalidQuantity { variant_id: VariantId },

    #[error("address not found")]
    AddressNotFound,

    #[error("variant {0} not found")]
    VariantNotFound(VariantId),

    #[error("variant {variant_id} does not belong to product {product_id}")]
    ProductMismatch {
        product_id: ProductId,
        variant_id: VariantId,
    },

    #[error(
        "insufficient stock for variant {variant_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        variant_id: VariantId,
        requested: i32,
        available: i64,
    },

    #[error("order not found")]
    NotFound,

    #[error("not allowed to change this order")]
    Forbidden,

    #[error("only pending orders can be cancelled (current status: {0})")]
    CancelNotAllowed(OrderStatus),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Demand for one variant after merging duplicate request lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Demand {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Merge request lines per variant, rejecting empty orders, non-positive or
/// oversized quantities, and one variant claimed for two products.
///
/// # Errors
///
/// Returns the first validation failure found.
pub fn aggregate_demand(
    items: &[OrderLineRequest],
) -> Result<BTreeMap<VariantId, Demand>, OrderError> {
    if items.is_empty() {
        return Err(OrderError::EmptyOrder);
    }

    let mut demand: BTreeMap<VariantId, Demand> = BTreeMap::new();
    for item in items {
        if item.quantity <= 0 {
            return Err(OrderError::InvalidQuantity {
                variant_id: item.variant_id,
            });
        }
        let entry = demand.entry(item.variant_id).or_insert(Demand {
            product_id: item.product_id,
            quantity: 0,
        });
        if entry.product_id != item.product_id {
            return Err(OrderError::ProductMismatch {
                product_id: item.product_id,
                variant_id: item.variant_id,
            });
        }
        entry.quantity = entry
            .quantity
            .checked_add(item.quantity)
            .filter(|q| *q <= MAX_LINE_QUANTITY)
            .ok_or(OrderError::InvalidQuantity {
                variant_id: item.variant_id,
            })?;
    }
    Ok(demand)
}

/// Who may move an order from its current status to `target`.
///
/// Admins may take any edge of the transition table. Owners may only cancel,
/// and only while the order is pending.
///
/// # Errors
///
/// Returns `OrderError::Forbidden`, `OrderError::CancelNotAllowed` or
/// `OrderError::InvalidTransition`.
pub fn authorize_change(
    actor: &CurrentUser,
    owner: UserId,
    current: OrderStatus,
    target: OrderStatus,
) -> Result<StatusChange, OrderError> {
    if !actor.is_admin() {
        if actor.id != owner || target != OrderStatus::Cancelled {
            return Err(OrderError::Forbidden);
        }
        if !matches!(current, OrderStatus::Pending | OrderStatus::Cancelled) {
            return Err(OrderError::CancelNotAllowed(current));
        }
    }
    Ok(current.transition_to(target)?)
}

/// Outcome of a status change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOutcome {
    pub order_id: OrderId,
    pub status: OrderStatus,
    /// `false` when the order already had the requested status.
    pub changed: bool,
}

pub struct OrderService<'a> {
    pool: &'a PgPool,
    relay: &'a OrderRelay,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, relay: &'a OrderRelay) -> Self {
        Self { pool, relay }
    }

    /// Place an order for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any row is written, or
    /// `OrderError::InsufficientStock` if any variant cannot cover its
    /// quantity. On any error nothing is persisted.
    #[instrument(skip(self, request), fields(user_id = %user_id, address_id = %request.address_id))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: &PlaceOrder,
    ) -> Result<PlacedOrder, OrderError> {
        let demand = aggregate_demand(&request.items)?;
        let variant_ids: Vec<VariantId> = demand.keys().copied().collect();

        let mut tx = self.pool.begin().await?;

        ensure_address(&mut tx, request.address_id, user_id).await?;

        let locked = inventory::lock_variants(&mut tx, &variant_ids).await?;
        let available = inventory::available_stock(&mut tx, &variant_ids).await?;

        for (&variant_id, wanted) in &demand {
            let variant = locked
                .get(&variant_id)
                .ok_or(OrderError::VariantNotFound(variant_id))?;
            if variant.product_id != wanted.product_id {
                return Err(OrderError::ProductMismatch {
                    product_id: wanted.product_id,
                    variant_id,
                });
            }
            let on_hand = available.get(&variant_id).copied().unwrap_or(0);
            if on_hand < i64::from(wanted.quantity) {
                return Err(OrderError::InsufficientStock {
                    variant_id,
                    requested: wanted.quantity,
                    available: on_hand,
                });
            }
        }

        let order_id = orders::insert_order(&mut tx, user_id, request.address_id).await?;

        let mut total = Decimal::ZERO;
        for (&variant_id, wanted) in &demand {
            let Some(variant) = locked.get(&variant_id) else {
                continue;
            };
            orders::insert_line(
                &mut tx,
                order_id,
                wanted.product_id,
                variant_id,
                wanted.quantity,
                variant.price,
            )
            .await?;
            inventory::record_sale(&mut tx, variant_id, wanted.quantity, order_id).await?;
            total += line_total(variant.price, wanted.quantity);
        }

        orders::set_total(&mut tx, order_id, total).await?;
        orders::insert_payment(
            &mut tx,
            order_id,
            request.payment_method.unwrap_or(PaymentMethod::CashOnDelivery),
            total,
        )
        .await?;
        carts::clear_for_user(&mut tx, user_id).await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, total = %total, lines = demand.len(), "Order placed");

        Ok(PlacedOrder {
            order_id,
            total,
            message: "Order placed successfully",
        })
    }

    /// Move an order to `target`, restocking on cancellation and notifying
    /// watchers after commit.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for a missing order, an authorization
    /// error from [`authorize_change`], or a repository error.
    #[instrument(skip(self, actor, note), fields(actor = %actor.id, order_id = %order_id, target = %target))]
    pub async fn change_status(
        &self,
        actor: &CurrentUser,
        order_id: OrderId,
        target: OrderStatus,
        note: Option<&str>,
    ) -> Result<StatusOutcome, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = orders::lock_order(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        let change = authorize_change(actor, order.user_id, order.status, target)?;
        if change.is_noop() {
            return Ok(StatusOutcome {
                order_id,
                status: order.status,
                changed: false,
            });
        }

        orders::update_status(&mut tx, order_id, target, note).await?;

        if change.restocks() {
            let restored = inventory::restock_order(
                &mut tx,
                order_id,
                &format!("Order #{order_id} cancelled"),
            )
            .await?;
            tracing::info!(order_id = %order_id, variants = restored.len(), "Order stock restored");
        }

        if let Some(payment) = PaymentStatus::for_order_status(target) {
            orders::sync_payment(&mut tx, order_id, payment).await?;
        }

        tx.commit().await?;

        tracing::info!(order_id = %order_id, from = %change.from, to = %change.to, "Order status changed");
        self.relay.broadcast(order_id, target);

        Ok(StatusOutcome {
            order_id,
            status: target,
            changed: true,
        })
    }

    /// Self-service cancellation by the order's owner.
    ///
    /// # Errors
    ///
    /// Same as [`Self::change_status`].
    pub async fn cancel(
        &self,
        actor: &CurrentUser,
        order_id: OrderId,
    ) -> Result<StatusOutcome, OrderError> {
        self.change_status(actor, order_id, OrderStatus::Cancelled, None)
            .await
    }
}

async fn ensure_address(
    conn: &mut sqlx::PgConnection,
    address_id: AddressId,
    user_id: UserId,
) -> Result<(), OrderError> {
    if addresses::is_owned_by(conn, address_id, user_id).await? {
        Ok(())
    } else {
        Err(OrderError::AddressNotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use techmart_core::{Email, UserRole};

    use super::*;

    fn line(product: i32, variant: i32, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            product_id: ProductId::new(product),
            variant_id: VariantId::new(variant),
            quantity,
        }
    }

    fn user(id: i32, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse("buyer@techmart.vn").unwrap(),
            full_name: "Buyer".to_string(),
            role,
        }
    }

    #[test]
    fn test_empty_order_rejected() {
        assert!(matches!(aggregate_demand(&[]), Err(OrderError::EmptyOrder)));
    }

    #[test]
    fn test_duplicate_variants_merged() {
        let demand = aggregate_demand(&[line(1, 7, 1), line(2, 3, 4), line(1, 7, 2)]).unwrap();
        assert_eq!(demand.len(), 2);
        assert_eq!(demand[&VariantId::new(7)].quantity, 3);
        // BTreeMap keeps lock order ascending.
        assert_eq!(
            demand.keys().copied().collect::<Vec<_>>(),
            vec![VariantId::new(3), VariantId::new(7)]
        );
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        assert!(matches!(
            aggregate_demand(&[line(1, 7, 0)]),
            Err(OrderError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            aggregate_demand(&[line(1, 7, -2)]),
            Err(OrderError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_oversized_quantity_rejected() {
        assert!(matches!(
            aggregate_demand(&[line(1, 7, MAX_LINE_QUANTITY), line(1, 7, 1)]),
            Err(OrderError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            aggregate_demand(&[line(1, 7, i32::MAX), line(1, 7, i32::MAX)]),
            Err(OrderError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_variant_claimed_by_two_products() {
        assert!(matches!(
            aggregate_demand(&[line(1, 7, 1), line(2, 7, 1)]),
            Err(OrderError::ProductMismatch { .. })
        ));
    }

    #[test]
    fn test_admin_follows_transition_table() {
        let admin = user(1, UserRole::Admin);
        let owner = UserId::new(2);
        let change =
            authorize_change(&admin, owner, OrderStatus::Processing, OrderStatus::Cancelled)
                .unwrap();
        assert!(change.restocks());
        assert!(matches!(
            authorize_change(&admin, owner, OrderStatus::Pending, OrderStatus::Shipped),
            Err(OrderError::InvalidTransition(_))
        ));
        assert!(matches!(
            authorize_change(&admin, owner, OrderStatus::Delivered, OrderStatus::Cancelled),
            Err(OrderError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_owner_may_only_cancel_pending() {
        let owner = user(2, UserRole::Customer);
        assert!(
            authorize_change(&owner, owner.id, OrderStatus::Pending, OrderStatus::Cancelled)
                .unwrap()
                .restocks()
        );
        assert!(matches!(
            authorize_change(&owner, owner.id, OrderStatus::Pending, OrderStatus::Processing),
            Err(OrderError::Forbidden)
        ));
        assert!(matches!(
            authorize_change(&owner, owner.id, OrderStatus::Shipped, OrderStatus::Cancelled),
            Err(OrderError::CancelNotAllowed(OrderStatus::Shipped))
        ));
    }

    #[test]
    fn test_recancel_is_noop() {
        let owner = user(2, UserRole::Customer);
        let change =
            authorize_change(&owner, owner.id, OrderStatus::Cancelled, OrderStatus::Cancelled)
                .unwrap();
        assert!(change.is_noop());
        assert!(!change.restocks());
    }

    #[test]
    fn test_stranger_forbidden() {
        let stranger = user(3, UserRole::Customer);
        assert!(matches!(
            authorize_change(
                &stranger,
                UserId::new(2),
                OrderStatus::Pending,
                OrderStatus::Cancelled
            ),
            Err(OrderError::Forbidden)
        ));
    }
}
