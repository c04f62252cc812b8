//! Status enums and the order status state machine.
//!
//! Each enum maps to a `PostgreSQL` enum type in the `shop` schema (with the
//! `postgres` feature) and to the same snake_case strings in JSON.

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

// =============================================================================
// Order status
// =============================================================================

/// Lifecycle state of an order.
///
/// ```text
/// pending ──► processing ──► shipped ──► delivered
///    │             │             │
///    └─────────────┴─────────────┴──► cancelled
/// ```
///
/// `delivered` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// A requested status change that is not in the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot change order status from {from} to {to}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// An accepted status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl StatusChange {
    /// The order already had the requested status. Nothing is written,
    /// restocked, or broadcast.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// Whether applying this change must return the order's units to stock.
    #[must_use]
    pub fn restocks(&self) -> bool {
        self.to == OrderStatus::Cancelled && self.from != OrderStatus::Cancelled
    }
}

impl OrderStatus {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Customer-facing explanation of the status.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pending => "Your order has been received and is awaiting confirmation",
            Self::Processing => "Your order is being prepared",
            Self::Shipped => "Your order is on its way",
            Self::Delivered => "Your order has been delivered",
            Self::Cancelled => "Your order has been cancelled",
        }
    }

    /// Statuses reachable in one step.
    #[must_use]
    pub const fn next_statuses(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered, Self::Cancelled],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.next_statuses().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Validate a status change against the transition table.
    ///
    /// Requesting the current status is accepted as a no-op so that retried
    /// requests (a double-clicked cancel button) are harmless.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if `next` is neither the current status
    /// nor reachable in one step.
    pub fn transition_to(self, next: Self) -> Result<StatusChange, InvalidTransition> {
        if self == next || self.can_transition_to(next) {
            Ok(StatusChange {
                from: self,
                to: next,
            })
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("order status", s))
    }
}

// =============================================================================
// Inventory ledger
// =============================================================================

/// Direction of an inventory ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.ledger_entry_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    /// Units entering stock (supplier delivery, cancelled order).
    Import,
    /// Units leaving stock (order placement).
    Export,
}

impl LedgerEntryKind {
    /// Effect of an entry of `quantity` units on available stock.
    #[must_use]
    pub fn signed(self, quantity: i32) -> i64 {
        match self {
            Self::Import => i64::from(quantity),
            Self::Export => -i64::from(quantity),
        }
    }
}

impl std::fmt::Display for LedgerEntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Import => write!(f, "import"),
            Self::Export => write!(f, "export"),
        }
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Payment state, kept in step with the order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Voided,
}

impl PaymentStatus {
    /// Payment status implied by an order entering `status`, if any.
    #[must_use]
    pub const fn for_order_status(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Delivered => Some(Self::Paid),
            OrderStatus::Cancelled => Some(Self::Voided),
            OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Shipped => None,
        }
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CashOnDelivery,
    BankTransfer,
    Card,
}

// =============================================================================
// Accounts
// =============================================================================

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Shops, places orders, writes reviews.
    #[default]
    Customer,
    /// Manages orders, inventory, catalog, and reviews.
    Admin,
}

impl UserRole {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseEnumError::new("user role", s)),
        }
    }
}
