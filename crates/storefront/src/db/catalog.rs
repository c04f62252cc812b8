//! Catalog repository: listings, product detail, browsing history and
//! recommendations.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use techmart_core::{ProductId, UserId, VariantId};

use super::RepositoryError;
use crate::models::catalog::{
    Brand, Category, NewProduct, Product, ProductQuery, ProductSummary, ProductUpdate, RatingStats,
    Variant,
};

/// Listing projection shared by every product list. Callers append `WHERE`,
/// `ORDER BY` and `LIMIT`.
const SUMMARY_SELECT: &str = r"
    SELECT p.id, p.name, p.category_id,
           c.name AS category_name,
           b.name AS brand_name,
           v.min_price, v.max_price,
           COALESCE(v.total_sold, 0) AS total_sold,
           COALESCE(r.avg_rating, 0) AS avg_rating,
           COALESCE(r.review_count, 0) AS review_count,
           COUNT(*) OVER () AS total_count
    FROM shop.products p
    LEFT JOIN shop.categories c ON c.id = p.category_id
    LEFT JOIN shop.brands b ON b.id = p.brand_id
    LEFT JOIN LATERAL (
        SELECT MIN(price) AS min_price, MAX(price) AS max_price,
               SUM(sold_count)::BIGINT AS total_sold
        FROM shop.productvariants WHERE product_id = p.id
    ) v ON TRUE
    LEFT JOIN LATERAL (
        SELECT ROUND(AVG(rating), 1) AS avg_rating, COUNT(*) AS review_count
        FROM shop.reviews WHERE product_id = p.id
    ) r ON TRUE
    WHERE p.is_active
";

/// Popularity score: 0.4 x average rating + 0.4 x units sold.
const POPULARITY_SCORE: &str =
    "(COALESCE(r.avg_rating, 0) * 0.4 + COALESCE(v.total_sold, 0) * 0.4)";

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.name, p.description, p.category_id, c.name AS category_name,
           p.brand_id, b.name AS brand_name, p.is_active, p.created_at
    FROM shop.products p
    LEFT JOIN shop.categories c ON c.id = p.category_id
    LEFT JOIN shop.brands b ON b.id = p.brand_id
";

const VARIANT_SELECT: &str = r"
    SELECT v.id, v.product_id, v.name, v.sku, v.price, v.initial_stock, v.sold_count,
           s.available
    FROM shop.productvariants v
    JOIN shop.variant_stock s ON s.variant_id = v.id
";

#[derive(sqlx::FromRow)]
struct CountedSummary {
    #[sqlx(flatten)]
    summary: ProductSummary,
    total_count: i64,
}

fn split_counted(rows: Vec<CountedSummary>) -> (Vec<ProductSummary>, i64) {
    let total = rows.first().map_or(0, |r| r.total_count);
    (rows.into_iter().map(|r| r.summary).collect(), total)
}

pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Filtered, sorted page of active products with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: &ProductQuery,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ProductSummary>, i64), RepositoryError> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(SUMMARY_SELECT);

        if let Some(category) = query.category {
            builder.push(" AND p.category_id = ").push_bind(category);
        }
        if let Some(brand) = query.brand {
            builder.push(" AND p.brand_id = ").push_bind(brand);
        }
        if let Some(term) = query.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            builder
                .push(" AND (p.name ILIKE ")
                .push_bind(format!("%{term}%"))
                .push(" OR p.description ILIKE ")
                .push_bind(format!("%{term}%"))
                .push(")");
        }
        if let Some(min_price) = query.min_price {
            builder.push(" AND v.max_price >= ").push_bind(min_price);
        }
        if let Some(max_price) = query.max_price {
            builder.push(" AND v.min_price <= ").push_bind(max_price);
        }

        builder
            .push(" ORDER BY ")
            .push(query.sort.order_by())
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder
            .build_query_as::<CountedSummary>()
            .fetch_all(self.pool)
            .await?;

        Ok(split_counted(rows))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bestsellers(&self, limit: i64) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CountedSummary>(&format!(
            "{SUMMARY_SELECT} AND COALESCE(v.total_sold, 0) > 0
             ORDER BY total_sold DESC, p.id LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(split_counted(rows).0)
    }

    /// Products ranked by rating and sales, for shoppers with no history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn popular(&self, limit: i64) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CountedSummary>(&format!(
            "{SUMMARY_SELECT} ORDER BY {POPULARITY_SCORE} DESC, p.id LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(split_counted(rows).0)
    }

    /// Unseen products from the user's three most-viewed categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn recommended_for(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CountedSummary>(&format!(
            r"
            WITH top_categories AS (
                SELECT p.category_id
                FROM shop.product_views pv
                JOIN shop.products p ON p.id = pv.product_id
                WHERE pv.user_id = $1 AND p.category_id IS NOT NULL
                GROUP BY p.category_id
                ORDER BY COUNT(*) DESC
                LIMIT 3
            )
            {SUMMARY_SELECT}
              AND p.category_id IN (SELECT category_id FROM top_categories)
              AND NOT EXISTS (
                  SELECT 1 FROM shop.product_views seen
                  WHERE seen.user_id = $1 AND seen.product_id = p.id
              )
            ORDER BY {POPULARITY_SCORE} DESC, p.id
            LIMIT $2
            "
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(split_counted(rows).0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_view_history(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM shop.product_views WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Record that a user opened a product page. Returns `false` if the
    /// product does not exist or is inactive.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record_view(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO shop.product_views (user_id, product_id)
            SELECT $1, id FROM shop.products WHERE id = $2 AND is_active
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// An active product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.id = $1 AND p.is_active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Variants of a product with available stock, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants(&self, product_id: ProductId) -> Result<Vec<Variant>, RepositoryError> {
        let variants = sqlx::query_as::<_, Variant>(&format!(
            "{VARIANT_SELECT} WHERE v.product_id = $1 ORDER BY v.price, v.id"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(variants)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variant(&self, id: VariantId) -> Result<Option<Variant>, RepositoryError> {
        let variant = sqlx::query_as::<_, Variant>(&format!("{VARIANT_SELECT} WHERE v.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(variant)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn rating_stats(&self, product_id: ProductId) -> Result<RatingStats, RepositoryError> {
        let stats = sqlx::query_as::<_, RatingStats>(
            r"
            SELECT COALESCE(ROUND(AVG(rating), 1), 0) AS avg_rating, COUNT(*) AS review_count
            FROM shop.reviews WHERE product_id = $1
            ",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            r"
            SELECT c.id, c.name, c.description, COUNT(p.id) AS product_count
            FROM shop.categories c
            LEFT JOIN shop.products p ON p.category_id = c.id AND p.is_active
            GROUP BY c.id
            ORDER BY c.name
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn brands(&self) -> Result<Vec<Brand>, RepositoryError> {
        let brands = sqlx::query_as::<_, Brand>("SELECT id, name FROM shop.brands ORDER BY name")
            .fetch_all(self.pool)
            .await?;
        Ok(brands)
    }

    /// Create a product and its variants in one transaction.
    ///
    /// Each variant's `initial_stock` is its opening balance; no ledger row is
    /// written for it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate SKU or unknown
    /// category/brand, `RepositoryError::Database` otherwise.
    #[instrument(skip(self, product), fields(name = %product.name, variants = product.variants.len()))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<ProductId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product_id: ProductId = sqlx::query_scalar(
            r"
            INSERT INTO shop.products (name, description, category_id, brand_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(product.name.trim())
        .bind(product.description.as_deref())
        .bind(product.category_id)
        .bind(product.brand_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "unknown category or brand"))?;

        for variant in &product.variants {
            sqlx::query(
                r"
                INSERT INTO shop.productvariants (product_id, name, sku, price, initial_stock)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(product_id)
            .bind(variant.name.trim())
            .bind(variant.sku.as_deref())
            .bind(variant.price.amount())
            .bind(variant.initial_stock)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "duplicate variant sku"))?;
        }

        tx.commit().await?;
        tracing::info!(product_id = %product_id, "Product created");
        Ok(product_id)
    }

    /// Apply an admin edit to a product and its variants in one transaction.
    ///
    /// Existing order lines keep the price captured when they were placed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist or a
    /// variant edit names a variant of another product,
    /// `RepositoryError::Conflict` for a duplicate SKU or unknown
    /// category/brand, `RepositoryError::Database` otherwise.
    #[instrument(skip(self, update), fields(product_id = %id, variants = update.variants.len()))]
    pub async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE shop.products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                category_id = COALESCE($4, category_id),
                brand_id = COALESCE($5, brand_id)
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.description.as_deref())
        .bind(update.category_id)
        .bind(update.brand_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "unknown category or brand"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        for edit in &update.variants {
            let result = sqlx::query(
                r"
                UPDATE shop.productvariants SET
                    name = COALESCE($3, name),
                    sku = COALESCE($4, sku),
                    price = COALESCE($5, price)
                WHERE id = $1 AND product_id = $2
                ",
            )
            .bind(edit.id)
            .bind(id)
            .bind(edit.name.as_deref().map(str::trim))
            .bind(edit.sku.as_deref())
            .bind(edit.price.map(|price| price.amount()))
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "duplicate variant sku"))?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        }

        tx.commit().await?;
        tracing::info!(product_id = %id, "Product updated");
        Ok(())
    }

    /// Hide a product from the catalog, carts and new orders.
    ///
    /// Rows are kept so past orders, reviews and the ledger stay intact.
    /// Returns `false` if the product does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn deactivate(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE shop.products SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
