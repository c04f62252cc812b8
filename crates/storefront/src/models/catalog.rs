//! Catalog models: categories, brands, products and variants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use techmart_core::{BrandId, CategoryId, Price, ProductId, VariantId};

use super::review::Review;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub product_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
}

/// A product in a listing, with price range and popularity figures.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub total_sold: i64,
    pub avg_rating: Decimal,
    pub review_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub brand_id: Option<BrandId>,
    pub brand_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A purchasable variant with its current stock position.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub initial_stock: i32,
    pub sold_count: i32,
    pub available: i64,
}

/// Product detail page payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<Variant>,
    pub avg_rating: Decimal,
    pub review_count: i64,
    pub total_sold: i64,
    pub recent_reviews: Vec<Review>,
}

/// Rating aggregate for one product.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct RatingStats {
    pub avg_rating: Decimal,
    pub review_count: i64,
}

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    BestSelling,
    TopRated,
}

impl ProductSort {
    /// `ORDER BY` clause for the listing query.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "min_price ASC NULLS LAST, p.id",
            Self::PriceDesc => "max_price DESC NULLS LAST, p.id",
            Self::BestSelling => "total_sold DESC, p.id",
            Self::TopRated => "avg_rating DESC, review_count DESC, p.id",
        }
    }
}

/// Query string for `GET /products`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category: Option<CategoryId>,
    pub brand: Option<BrandId>,
    pub q: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Request body for `POST /admin/products`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub variants: Vec<NewVariant>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVariant {
    pub name: String,
    pub sku: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub initial_stock: i32,
}

impl NewProduct {
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if self.variants.is_empty() {
            return Err("a product needs at least one variant".to_string());
        }
        for variant in &self.variants {
            if variant.name.trim().is_empty() {
                return Err("variant name is required".to_string());
            }
            if variant.initial_stock < 0 {
                return Err(format!(
                    "initialStock for variant {} cannot be negative",
                    variant.name
                ));
            }
        }
        Ok(())
    }
}

/// Request body for `PUT /admin/products/{id}`. Omitted fields keep their
/// current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub variants: Vec<VariantEdit>,
}

/// Edit of an existing variant. Stock is not editable here; it moves only
/// through the ledger.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantEdit {
    pub id: VariantId,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Price>,
}

impl ProductUpdate {
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err("name cannot be blank".to_string());
        }
        for edit in &self.variants {
            if edit.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
                return Err(format!("name for variant {} cannot be blank", edit.id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_query_parses_sort() {
        let query: ProductQuery =
            serde_json::from_str(r#"{"sort":"price_desc","category":2}"#).unwrap();
        assert_eq!(query.sort, ProductSort::PriceDesc);
        assert_eq!(query.category, Some(CategoryId::new(2)));
    }

    #[test]
    fn test_new_product_requires_variants() {
        let product: NewProduct =
            serde_json::from_str(r#"{"name":"Laptop X1","variants":[]}"#).unwrap();
        assert_eq!(
            product.validate(),
            Err("a product needs at least one variant".to_string())
        );
    }

    #[test]
    fn test_new_product_rejects_negative_stock() {
        let product: NewProduct = serde_json::from_str(
            r#"{"name":"Laptop X1","variants":[{"name":"16GB","price":"999.00","initialStock":-1}]}"#,
        )
        .unwrap();
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_new_variant_rejects_negative_price() {
        let result = serde_json::from_str::<NewVariant>(r#"{"name":"16GB","price":"-5"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_product_update_accepts_partial_body() {
        let update: ProductUpdate =
            serde_json::from_str(r#"{"variants":[{"id":7,"price":"1250000"}]}"#).unwrap();
        assert!(update.name.is_none());
        assert_eq!(update.variants[0].id, VariantId::new(7));
        assert_eq!(
            update.variants[0].price.map(|price| price.amount()),
            Some(Decimal::from(1_250_000))
        );
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_product_update_rejects_blank_names() {
        let update: ProductUpdate = serde_json::from_str(r#"{"name":"  "}"#).unwrap();
        assert_eq!(update.validate(), Err("name cannot be blank".to_string()));

        let update: ProductUpdate =
            serde_json::from_str(r#"{"variants":[{"id":3,"name":""}]}"#).unwrap();
        assert!(update.validate().is_err());
    }
}
