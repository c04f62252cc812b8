//! Shipping addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use techmart_core::{AddressId, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    #[serde(skip)]
    pub user_id: UserId,
    pub recipient_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /addresses`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub recipient_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl NewAddress {
    /// Check required fields are present.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first missing field.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("recipientName", &self.recipient_name),
            ("phone", &self.phone),
            ("line1", &self.line1),
            ("city", &self.city),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> NewAddress {
        NewAddress {
            recipient_name: "Tran Minh".to_string(),
            phone: "0901234567".to_string(),
            line1: "12 Nguyen Hue".to_string(),
            line2: None,
            city: "Ho Chi Minh City".to_string(),
            province: None,
            postal_code: None,
            country: None,
            is_default: true,
        }
    }

    #[test]
    fn test_validate_accepts_complete_address() {
        assert!(address().validate().is_ok());
    }

    #[test]
    fn test_validate_names_missing_field() {
        let mut incomplete = address();
        incomplete.city = "  ".to_string();
        assert_eq!(incomplete.validate(), Err("city is required".to_string()));
    }
}
