//! Minifigure enrichment repository.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{MinifigDetails, NewMinifigDetails};

/// Repository for `catalog.minifig_details`.
pub struct MinifigRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MinifigRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Details for one item number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, item_no: &str) -> Result<Option<MinifigDetails>, RepositoryError> {
        let details = sqlx::query_as::<_, MinifigDetails>(
            r"
            SELECT item_no, name, category_id, category_name, year_released,
                   weight_grams, image_url, thumbnail_url, fetched_at
            FROM catalog.minifig_details
            WHERE lower(item_no) = lower($1)
            ",
        )
        .bind(item_no.trim())
        .fetch_optional(self.pool)
        .await?;
        Ok(details)
    }

    /// Distinct minifig item numbers in the catalog that need enrichment.
    ///
    /// With `refresh`, every minifig item number is returned; otherwise only
    /// those without a details row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn item_numbers_to_enrich(
        &self,
        refresh: bool,
        limit: Option<i64>,
    ) -> Result<Vec<String>, RepositoryError> {
        let item_nos = sqlx::query_scalar::<_, String>(
            r"
            SELECT DISTINCT p.item_no
            FROM catalog.product p
            LEFT JOIN catalog.minifig_details d ON lower(d.item_no) = lower(p.item_no)
            WHERE p.item_type = 'minifig'
              AND ($1 OR d.item_no IS NULL)
            ORDER BY p.item_no
            LIMIT $2
            ",
        )
        .bind(refresh)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(item_nos)
    }

    /// Insert or replace details for one item number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, details: &NewMinifigDetails) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO catalog.minifig_details
                (item_no, name, category_id, category_name, year_released,
                 weight_grams, image_url, thumbnail_url, fetched_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
            ON CONFLICT (item_no) DO UPDATE SET
                name = EXCLUDED.name,
                category_id = EXCLUDED.category_id,
                category_name = EXCLUDED.category_name,
                year_released = EXCLUDED.year_released,
                weight_grams = EXCLUDED.weight_grams,
                image_url = EXCLUDED.image_url,
                thumbnail_url = EXCLUDED.thumbnail_url,
                fetched_at = now()
            ",
        )
        .bind(&details.item_no)
        .bind(&details.name)
        .bind(details.category_id)
        .bind(&details.category_name)
        .bind(details.year_released)
        .bind(details.weight_grams)
        .bind(&details.image_url)
        .bind(&details.thumbnail_url)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
