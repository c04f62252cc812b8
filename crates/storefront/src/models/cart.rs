//! Cart models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use techmart_core::{CartItemId, ProductId, VariantId};

/// One line of the caller's cart, priced at the current variant price.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub variant_id: VariantId,
    pub variant_name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub available: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Vec<CartLine>,
    pub total: Decimal,
}

impl CartSummary {
    #[must_use]
    pub fn new(items: Vec<CartLine>) -> Self {
        let total = items.iter().map(|line| line.line_total).sum();
        Self { items, total }
    }
}

/// Request body for `POST /cart/add`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

/// Request body for `PUT /cart/update`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItem {
    pub cart_item_id: CartItemId,
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn line(id: i32, price: &str, quantity: i32) -> CartLine {
        let price = Decimal::from_str(price).unwrap();
        CartLine {
            id: CartItemId::new(id),
            product_id: ProductId::new(1),
            product_name: "Phone".to_string(),
            variant_id: VariantId::new(id),
            variant_name: "128GB".to_string(),
            price,
            quantity,
            line_total: techmart_core::line_total(price, quantity),
            available: 10,
        }
    }

    #[test]
    fn test_cart_summary_totals_lines() {
        let summary = CartSummary::new(vec![line(1, "199.99", 2), line(2, "5.01", 1)]);
        assert_eq!(summary.total, Decimal::from_str("404.99").unwrap());
    }

    #[test]
    fn test_add_to_cart_defaults_quantity() {
        let body: AddToCart = serde_json::from_str(r#"{"productId":1,"variantId":3}"#).unwrap();
        assert_eq!(body.quantity, 1);
    }
}
