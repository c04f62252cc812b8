//! Order models.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use techmart_core::{
    AddressId, OrderId, OrderItemId, OrderStatus, PaymentId, PaymentMethod, PaymentStatus,
    ProductId, UserId, VariantId,
};

use super::address::Address;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub total: Decimal,
    pub status: OrderStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item with the unit price captured when the order was placed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub variant_id: VariantId,
    pub variant_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub status_description: &'static str,
    pub items: Vec<OrderLine>,
}

impl OrderWithItems {
    #[must_use]
    pub fn new(order: Order, items: Vec<OrderLine>) -> Self {
        Self {
            status_description: order.status.description(),
            order,
            items,
        }
    }
}

/// Response of `GET /orders/{id}/status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusView {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub status_description: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderStatusView {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            status: order.status,
            status_description: order.status.description(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Request body for `POST /orders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub address_id: AddressId,
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total: Decimal,
    pub message: &'static str,
}

/// Request body for status changes. The status stays a string so an unknown
/// value can be answered with a 400 naming it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChanged {
    pub message: &'static str,
    pub order_id: OrderId,
    pub new_status: OrderStatus,
}

/// Query string for `GET /orders`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
}

// =============================================================================
// Admin views
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderSummary {
    pub id: OrderId,
    pub user_id: UserId,
    pub customer_name: String,
    pub customer_email: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub status_description: &'static str,
    pub allowed_statuses: &'static [OrderStatus],
    pub customer: Customer,
    pub shipping_address: Address,
    pub payment: Option<Payment>,
    pub items: Vec<OrderLine>,
}

/// Order counts per status plus recognised revenue.
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending: i64,
    pub processing: i64,
    pub shipped: i64,
    pub delivered: i64,
    pub cancelled: i64,
    /// Sum of totals of shipped and delivered orders.
    pub revenue: Decimal,
}

/// Creation-date window for the admin order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    Today,
    Week,
    Month,
    #[default]
    All,
}

impl DateRange {
    /// Earliest creation time included in the window.
    #[must_use]
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let midnight = Utc
            .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
            .single()?;
        match self {
            Self::Today => Some(midnight),
            Self::Week => Some(midnight - Duration::days(7)),
            Self::Month => Some(midnight - Duration::days(30)),
            Self::All => None,
        }
    }
}

/// Query string for `GET /admin/orders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub range: DateRange,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderList {
    #[serde(flatten)]
    pub page: super::Paginated<AdminOrderSummary>,
    pub stats: OrderStats,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_windows() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 17, 45, 0).unwrap();
        let midnight = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap();

        assert_eq!(DateRange::Today.since(now), Some(midnight));
        assert_eq!(
            DateRange::Week.since(now),
            Some(Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap())
        );
        assert_eq!(DateRange::All.since(now), None);
    }

    #[test]
    fn test_place_order_body() {
        let body: PlaceOrder = serde_json::from_str(
            r#"{"addressId":4,"items":[{"productId":1,"variantId":7,"quantity":2}],"paymentMethod":"bank_transfer"}"#,
        )
        .unwrap();
        assert_eq!(body.address_id, AddressId::new(4));
        assert_eq!(body.items.len(), 1);
        assert_eq!(body.payment_method, Some(PaymentMethod::BankTransfer));
    }

    #[test]
    fn test_status_view_includes_description() {
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(9),
            user_id: UserId::new(1),
            address_id: AddressId::new(1),
            total: Decimal::ZERO,
            status: OrderStatus::Shipped,
            note: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(OrderStatusView::from(&order)).unwrap();
        assert_eq!(json["orderId"], 9);
        assert_eq!(json["status"], "shipped");
        assert_eq!(json["statusDescription"], "Your order is on its way");
    }
}
