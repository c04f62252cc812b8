//! Catalog reads with a short-lived cache for the ranked lists.
//!
//! Bestsellers and the popularity fallback for recommendations are the same
//! for every shopper, so they are cached for 5 minutes. Everything else reads
//! through to the database.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use techmart_core::{ProductId, UserId};

use crate::db::{CatalogRepository, RepositoryError, ReviewRepository};
use crate::models::catalog::{ProductDetail, ProductSummary};

/// Number of products in the bestseller and recommendation lists.
pub const RANKED_LIST_SIZE: i64 = 10;

/// Reviews embedded in the product detail.
pub const RECENT_REVIEWS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RankedList {
    Bestsellers,
    Popular,
}

/// Shared cache of ranked product lists.
#[derive(Clone)]
pub struct CatalogCache {
    ranked: Cache<RankedList, Arc<Vec<ProductSummary>>>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let ranked = Cache::builder()
            .max_capacity(16)
            .time_to_live(ttl)
            .build();
        Self { ranked }
    }

    /// Drop cached lists, e.g. after the catalog changes.
    pub fn invalidate(&self) {
        self.ranked.invalidate_all();
    }
}

pub struct CatalogService<'a> {
    repo: CatalogRepository<'a>,
    reviews: ReviewRepository<'a>,
    cache: &'a CatalogCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self {
            repo: CatalogRepository::new(pool),
            reviews: ReviewRepository::new(pool),
            cache,
        }
    }

    /// Top sellers by units sold across all variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bestsellers(&self) -> Result<Arc<Vec<ProductSummary>>, RepositoryError> {
        self.ranked(RankedList::Bestsellers).await
    }

    /// Personal recommendations, falling back to overall popularity for
    /// shoppers without browsing history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn recommendations(
        &self,
        user_id: UserId,
    ) -> Result<Arc<Vec<ProductSummary>>, RepositoryError> {
        if self.repo.has_view_history(user_id).await? {
            let products = self.repo.recommended_for(user_id, RANKED_LIST_SIZE).await?;
            if !products.is_empty() {
                return Ok(Arc::new(products));
            }
            debug!("No unseen products in favourite categories, using popularity");
        }
        self.ranked(RankedList::Popular).await
    }

    /// Product page: product, variants with stock, rating and recent reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn product_detail(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(product) = self.repo.product(id).await? else {
            return Ok(None);
        };
        let variants = self.repo.variants(id).await?;
        let stats = self.repo.rating_stats(id).await?;
        let recent_reviews = self.reviews.recent_for_product(id, RECENT_REVIEWS).await?;
        let total_sold = variants.iter().map(|v| i64::from(v.sold_count)).sum();

        Ok(Some(ProductDetail {
            product,
            variants,
            avg_rating: stats.avg_rating,
            review_count: stats.review_count,
            total_sold,
            recent_reviews,
        }))
    }

    async fn ranked(&self, list: RankedList) -> Result<Arc<Vec<ProductSummary>>, RepositoryError> {
        if let Some(cached) = self.cache.ranked.get(&list).await {
            debug!(?list, "Ranked list cache hit");
            return Ok(cached);
        }

        let products = match list {
            RankedList::Bestsellers => self.repo.bestsellers(RANKED_LIST_SIZE).await?,
            RankedList::Popular => self.repo.popular(RANKED_LIST_SIZE).await?,
        };
        let products = Arc::new(products);
        self.cache.ranked.insert(list, Arc::clone(&products)).await;
        Ok(products)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_round_trip_and_invalidate() {
        let cache = CatalogCache::default();
        cache
            .ranked
            .insert(RankedList::Popular, Arc::new(Vec::new()))
            .await;
        assert!(cache.ranked.get(&RankedList::Popular).await.is_some());
        assert!(cache.ranked.get(&RankedList::Bestsellers).await.is_none());

        cache.invalidate();
        assert!(cache.ranked.get(&RankedList::Popular).await.is_none());
    }
}
