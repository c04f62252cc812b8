//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use techmart_core::{Email, UserId, UserRole};

/// A storefront account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}
