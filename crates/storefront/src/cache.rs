//! In-memory cache for catalog facet counts.
//!
//! Theme and series counts aggregate the whole in-stock catalog, so they are
//! cached for a minute using `moka`. Admin stock changes invalidate the cache.

use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use brickhaus_core::catalog::Facet;

use crate::db::{ProductRepository, RepositoryError};

const FACET_TTL: Duration = Duration::from_secs(60);

/// Cache key for facet listings.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum FacetKey {
    Themes,
    Series,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum FacetValue {
    Themes(Vec<Facet<String>>),
    Series(Vec<Facet<i32>>),
}

/// Facet count cache. Cheaply cloneable.
#[derive(Clone)]
pub struct FacetCache {
    cache: Cache<FacetKey, FacetValue>,
}

impl Default for FacetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FacetCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(16)
                .time_to_live(FACET_TTL)
                .build(),
        }
    }

    /// In-stock product counts per theme.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on a cache miss whose query fails.
    pub async fn themes(&self, pool: &PgPool) -> Result<Vec<Facet<String>>, RepositoryError> {
        if let Some(FacetValue::Themes(themes)) = self.cache.get(&FacetKey::Themes).await {
            debug!("Cache hit for theme facets");
            return Ok(themes);
        }

        let themes = ProductRepository::new(pool).theme_facets().await?;
        self.cache
            .insert(FacetKey::Themes, FacetValue::Themes(themes.clone()))
            .await;
        Ok(themes)
    }

    /// In-stock product counts per CMF series.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on a cache miss whose query fails.
    pub async fn series(&self, pool: &PgPool) -> Result<Vec<Facet<i32>>, RepositoryError> {
        if let Some(FacetValue::Series(series)) = self.cache.get(&FacetKey::Series).await {
            debug!("Cache hit for series facets");
            return Ok(series);
        }

        let series = ProductRepository::new(pool).series_facets().await?;
        self.cache
            .insert(FacetKey::Series, FacetValue::Series(series.clone()))
            .await;
        Ok(series)
    }

    /// Drop all cached facets.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cached_facets_skip_the_database() {
        // The pool is never connected; a cache hit must not touch it.
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let facets = FacetCache::new();
        let themes = vec![Facet {
            key: "Star Wars".to_string(),
            count: 12,
        }];
        facets
            .cache
            .insert(FacetKey::Themes, FacetValue::Themes(themes.clone()))
            .await;

        assert_eq!(facets.themes(&pool).await.unwrap(), themes);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let facets = FacetCache::new();
        facets
            .cache
            .insert(FacetKey::Series, FacetValue::Series(Vec::new()))
            .await;
        facets.invalidate_all().await;
        assert!(facets.cache.get(&FacetKey::Series).await.is_none());
    }
}
