//! Catalog product repository.
//!
//! Listing queries are built with `sqlx::QueryBuilder` from a validated
//! [`ProductFilter`]. User input only ever reaches the database as bound
//! parameters; the SQL text is assembled from fixed fragments.

use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::instrument;

use brickhaus_core::catalog::{Facet, ProductFilter, SortOrder};
use brickhaus_core::{InventoryId, ItemType};

use super::{RepositoryError, map_constraint};
use crate::models::{EnrichedProduct, NewProduct, Product};

const PRODUCT_COLUMNS: &str = "p.inventory_id, p.item_no, p.name, p.item_type, p.condition, \
     p.price, p.qty, p.image_url, p.remarks, p.description, p.theme, p.series, \
     p.created_at, p.updated_at";

/// Which rows a purge deletes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeFilter {
    /// Only rows with `qty = 0`.
    pub zero_stock: bool,
    /// Only rows of this type.
    pub item_type: Option<ItemType>,
    /// Only rows whose inventory id is NOT in this set (sync `--purge-missing`).
    pub keep: Option<Vec<InventoryId>>,
}

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products matching `filter`, plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut query = select_products(filter);
        let items = query.build_query_as::<Product>().fetch_all(self.pool).await?;

        let mut count = count_products(filter);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        Ok((items, total))
    }

    /// One page of minifigure listings joined with their catalog details.
    ///
    /// The item type filter is forced to minifigs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list_minifigs(
        &self,
        filter: &ProductFilter,
    ) -> Result<(Vec<EnrichedProduct>, i64), RepositoryError> {
        let filter = ProductFilter {
            item_type: Some(ItemType::Minifig),
            ..filter.clone()
        };

        let mut query = select_enriched(&filter);
        let items = query
            .build_query_as::<EnrichedProduct>()
            .fetch_all(self.pool)
            .await?;

        let mut count = count_products(&filter);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        Ok((items, total))
    }

    /// Get a product by inventory id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: InventoryId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.inventory_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Get every product in `ids`. Unknown ids are silently absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[InventoryId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = ids.iter().map(InventoryId::as_i64).collect();
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.inventory_id = ANY($1)"
        ))
        .bind(raw)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Every minifig listing (any condition, any stock) for one catalog item
    /// number. Sets and parts sharing the number are left out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn minifig_listings(&self, item_no: &str) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&minifig_listings_sql())
            .bind(item_no.trim())
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// In-stock listing counts per theme, largest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn theme_facets(&self) -> Result<Vec<Facet<String>>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT theme, COUNT(*) FROM catalog.product WHERE qty > 0 \
             GROUP BY theme ORDER BY COUNT(*) DESC, theme ASC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(key, count)| Facet { key, count })
            .collect())
    }

    /// In-stock listing counts per CMF series, in series order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn series_facets(&self) -> Result<Vec<Facet<i32>>, RepositoryError> {
        let rows = sqlx::query_as::<_, (i32, i64)>(
            "SELECT series, COUNT(*) FROM catalog.product \
             WHERE qty > 0 AND series IS NOT NULL \
             GROUP BY series ORDER BY series ASC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(key, count)| Facet { key, count })
            .collect())
    }

    /// Insert or update a batch of products in one transaction.
    ///
    /// Rows are keyed on `inventory_id`; `created_at` survives updates.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a row violates a constraint and
    /// `RepositoryError::Database` for other failures. Nothing is written on error.
    #[instrument(skip(self, products), fields(count = products.len()))]
    pub async fn upsert_many(&self, products: &[NewProduct]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for product in products {
            written += upsert(&mut tx, product).await?;
        }
        tx.commit().await?;
        Ok(written)
    }

    /// Add stock to a product and return the new quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn restock(&self, id: InventoryId, qty: i32) -> Result<i32, RepositoryError> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE catalog.product SET qty = qty + $2 WHERE inventory_id = $1 RETURNING qty",
        )
        .bind(id)
        .bind(qty)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_constraint(e, "restock"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: InventoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.product WHERE inventory_id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count the rows a purge would delete.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_purgeable(&self, filter: &PurgeFilter) -> Result<i64, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catalog.product");
        push_purge_filter(&mut query, filter);
        Ok(query.build_query_scalar::<i64>().fetch_one(self.pool).await?)
    }

    /// Delete every row matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn purge(&self, filter: &PurgeFilter) -> Result<u64, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new("DELETE FROM catalog.product");
        push_purge_filter(&mut query, filter);
        let result = query.build().execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Every product's id, name and item number, for reclassification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn classification_inputs(
        &self,
    ) -> Result<Vec<(InventoryId, String, String)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (InventoryId, String, String)>(
            "SELECT inventory_id, name, item_no FROM catalog.product ORDER BY inventory_id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Overwrite a product's theme and series. Returns `true` if anything changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_classification(
        &self,
        id: InventoryId,
        theme: &str,
        series: Option<i32>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE catalog.product SET theme = $2, series = $3 \
             WHERE inventory_id = $1 AND (theme <> $2 OR series IS DISTINCT FROM $3)",
        )
        .bind(id)
        .bind(theme)
        .bind(series)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Insert or update one product inside a transaction.
async fn upsert(
    tx: &mut Transaction<'_, Postgres>,
    product: &NewProduct,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        INSERT INTO catalog.product
            (inventory_id, item_no, name, item_type, condition, price, qty,
             image_url, remarks, description, theme, series)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (inventory_id) DO UPDATE SET
            item_no = EXCLUDED.item_no,
            name = EXCLUDED.name,
            item_type = EXCLUDED.item_type,
            condition = EXCLUDED.condition,
            price = EXCLUDED.price,
            qty = EXCLUDED.qty,
            image_url = COALESCE(EXCLUDED.image_url, catalog.product.image_url),
            remarks = EXCLUDED.remarks,
            description = EXCLUDED.description,
            theme = EXCLUDED.theme,
            series = EXCLUDED.series
        ",
    )
    .bind(product.inventory_id)
    .bind(&product.item_no)
    .bind(&product.name)
    .bind(product.item_type)
    .bind(product.condition)
    .bind(product.price)
    .bind(product.qty)
    .bind(&product.image_url)
    .bind(&product.remarks)
    .bind(&product.description)
    .bind(&product.theme)
    .bind(product.series)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_constraint(e, "product"))?;
    Ok(result.rows_affected())
}

/// Take `qty` units out of stock, only if that many are available.
///
/// Returns `false` (and changes nothing) when stock is short.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn decrement_stock(
    tx: &mut Transaction<'_, Postgres>,
    id: InventoryId,
    qty: i32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE catalog.product SET qty = qty - $2 WHERE inventory_id = $1 AND qty >= $2",
    )
    .bind(id)
    .bind(qty)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Return `qty` units to stock. Returns `false` if the product no longer exists.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn increment_stock(
    tx: &mut Transaction<'_, Postgres>,
    id: InventoryId,
    qty: i32,
) -> Result<bool, RepositoryError> {
    let result =
        sqlx::query("UPDATE catalog.product SET qty = qty + $2 WHERE inventory_id = $1")
            .bind(id)
            .bind(qty)
            .execute(&mut **tx)
            .await?;
    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Query building
// =============================================================================

fn minifig_listings_sql() -> String {
    format!(
        "SELECT {PRODUCT_COLUMNS} FROM catalog.product p \
         WHERE p.item_type = 'minifig' AND lower(p.item_no) = lower($1) \
         ORDER BY p.qty > 0 DESC, p.price ASC"
    )
}

fn select_products(filter: &ProductFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM catalog.product p"));
    push_filter(&mut query, filter);
    push_order_and_page(&mut query, filter);
    query
}

fn select_enriched(filter: &ProductFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!(
        "SELECT {PRODUCT_COLUMNS}, d.category_name, d.year_released, d.weight_grams \
         FROM catalog.product p \
         LEFT JOIN catalog.minifig_details d ON lower(d.item_no) = lower(p.item_no)"
    ));
    push_filter(&mut query, filter);
    push_order_and_page(&mut query, filter);
    query
}

fn count_products(filter: &ProductFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM catalog.product p");
    push_filter(&mut query, filter);
    query
}

/// Append the `WHERE` clause for a filter. Absent filters add nothing.
fn push_filter(query: &mut QueryBuilder<'static, Postgres>, filter: &ProductFilter) {
    query.push(" WHERE TRUE");

    if filter.in_stock {
        query.push(" AND p.qty > 0");
    }

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        query
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR p.item_no ILIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }

    if let Some(theme) = &filter.theme {
        query
            .push(" AND lower(p.theme) = lower(")
            .push_bind(theme.clone())
            .push(")");
    }

    if let Some(condition) = filter.condition {
        query.push(" AND p.condition = ").push_bind(condition);
    }

    if let Some(item_type) = filter.item_type {
        query.push(" AND p.item_type = ").push_bind(item_type);
    }

    if let Some(series) = filter.series {
        query.push(" AND p.series = ").push_bind(series);
    }

    if let Some(min) = filter.min_price {
        query.push(" AND p.price >= ").push_bind(min);
    }

    if let Some(max) = filter.max_price {
        query.push(" AND p.price <= ").push_bind(max);
    }
}

fn push_order_and_page(query: &mut QueryBuilder<'static, Postgres>, filter: &ProductFilter) {
    query.push(" ORDER BY ").push(order_clause(filter.sort));
    query.push(" LIMIT ").push_bind(filter.limit());
    query.push(" OFFSET ").push_bind(filter.offset());
}

/// `ORDER BY` columns for a sort. The inventory id breaks ties so pages are stable.
const fn order_clause(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Newest => "p.created_at DESC, p.inventory_id DESC",
        SortOrder::PriceAsc => "p.price ASC, p.inventory_id ASC",
        SortOrder::PriceDesc => "p.price DESC, p.inventory_id ASC",
        SortOrder::NameAsc => "p.name ASC, p.inventory_id ASC",
        SortOrder::NameDesc => "p.name DESC, p.inventory_id ASC",
    }
}

fn push_purge_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &PurgeFilter) {
    query.push(" WHERE TRUE");
    if filter.zero_stock {
        query.push(" AND qty = 0");
    }
    if let Some(item_type) = filter.item_type {
        query.push(" AND item_type = ").push_bind(item_type);
    }
    if let Some(keep) = &filter.keep {
        let raw: Vec<i64> = keep.iter().map(InventoryId::as_i64).collect();
        query.push(" AND NOT (inventory_id = ANY(").push_bind(raw).push("))");
    }
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use brickhaus_core::Condition;
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), r"50\%\_off\\");
        assert_eq!(escape_like("boba fett"), "boba fett");
    }

    #[test]
    fn test_empty_filter_only_restricts_stock() {
        let query = select_products(&ProductFilter::default());
        let sql = query.sql();
        assert!(sql.contains("WHERE TRUE AND p.qty > 0 ORDER BY p.created_at DESC"));
        assert!(sql.ends_with("LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn test_out_of_stock_filter_adds_nothing() {
        let filter = ProductFilter {
            in_stock: false,
            ..ProductFilter::default()
        };
        let query = count_products(&filter);
        assert_eq!(query.sql(), "SELECT COUNT(*) FROM catalog.product p WHERE TRUE");
    }

    #[test]
    fn test_filters_compose_with_and_and_bind_values() {
        let filter = ProductFilter {
            search: Some("Boba' OR 1=1 --".to_string()),
            theme: Some("Star Wars".to_string()),
            condition: Some(Condition::New),
            item_type: Some(ItemType::Minifig),
            series: Some(3),
            min_price: Some(Decimal::new(5, 0)),
            max_price: Some(Decimal::new(50, 0)),
            sort: SortOrder::PriceAsc,
            ..ProductFilter::default()
        };
        let query = select_products(&filter);
        let sql = query.sql();

        // User input never appears in the SQL text
        assert!(!sql.contains("Boba"));
        assert!(!sql.contains("Star Wars"));

        for fragment in [
            "p.qty > 0",
            r"(p.name ILIKE $1 ESCAPE '\' OR p.item_no ILIKE $2 ESCAPE '\')",
            "lower(p.theme) = lower($3)",
            "p.condition = $4",
            "p.item_type = $5",
            "p.series = $6",
            "p.price >= $7",
            "p.price <= $8",
            "ORDER BY p.price ASC, p.inventory_id ASC LIMIT $9 OFFSET $10",
        ] {
            assert!(sql.contains(fragment), "missing {fragment:?} in {sql}");
        }
        assert_eq!(sql.matches(" AND ").count(), 8);
    }

    #[test]
    fn test_enriched_select_joins_details() {
        let query = select_enriched(&ProductFilter::default());
        assert!(query.sql().contains("LEFT JOIN catalog.minifig_details d"));
    }

    #[test]
    fn test_purge_filter() {
        let filter = PurgeFilter {
            zero_stock: true,
            item_type: Some(ItemType::Part),
            keep: Some(vec![InventoryId::new(1), InventoryId::new(2)]),
        };
        let mut query = QueryBuilder::<Postgres>::new("DELETE FROM catalog.product");
        push_purge_filter(&mut query, &filter);
        assert_eq!(
            query.sql(),
            "DELETE FROM catalog.product WHERE TRUE AND qty = 0 AND item_type = $1 \
             AND NOT (inventory_id = ANY($2))"
        );
    }

    #[test]
    fn test_minifig_listings_only_match_minifigs() {
        let sql = minifig_listings_sql();
        assert!(sql.contains("p.item_type = 'minifig'"));
        assert!(sql.contains("lower(p.item_no) = lower($1)"));
    }
}
