//! Catalog filter parameters and pagination.
//!
//! [`CatalogQuery`] is the raw query string as the listing routes receive
//! it; [`CatalogQuery::into_filter`] validates and normalizes it into a
//! [`ProductFilter`] that the storefront turns into SQL.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Condition, ItemType};

/// Default page size for listings.
pub const DEFAULT_PER_PAGE: u32 = 24;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Longest search string accepted.
pub const MAX_SEARCH_LENGTH: usize = 100;

/// Errors from validating a catalog query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("{0}")]
    InvalidCondition(String),
    #[error("{0}")]
    InvalidItemType(String),
    #[error("invalid price: {0}")]
    InvalidPrice(String),
    #[error("unknown sort order: {0}")]
    InvalidSort(String),
    #[error("search is too long")]
    SearchTooLong,
}

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

impl core::str::FromStr for SortOrder {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "newest" => Ok(Self::Newest),
            "price_asc" | "price" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "name_asc" | "name" => Ok(Self::NameAsc),
            "name_desc" => Ok(Self::NameDesc),
            other => Err(FilterError::InvalidSort(other.to_string())),
        }
    }
}

/// Raw listing query parameters.
///
/// Everything is optional and stringly typed so that a bad value produces
/// a descriptive 400 instead of a generic extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub q: Option<String>,
    pub theme: Option<String>,
    pub condition: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub series: Option<i32>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub in_stock: Option<bool>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// A validated catalog filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub theme: Option<String>,
    pub condition: Option<Condition>,
    pub item_type: Option<ItemType>,
    pub series: Option<i32>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Only rows with `qty > 0`.
    pub in_stock: bool,
    pub sort: SortOrder,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            search: None,
            theme: None,
            condition: None,
            item_type: None,
            series: None,
            min_price: None,
            max_price: None,
            in_stock: true,
            sort: SortOrder::Newest,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ProductFilter {
    /// Row offset for the current page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    /// Row limit for the current page.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

impl CatalogQuery {
    /// Validate and normalize into a [`ProductFilter`].
    ///
    /// - blank strings count as absent
    /// - `page` is at least 1; `per_page` is clamped to `1..=MAX_PER_PAGE`
    /// - an inverted price range is swapped rather than rejected
    /// - negative prices are rejected
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] naming the first invalid parameter.
    pub fn into_filter(self) -> Result<ProductFilter, FilterError> {
        let search = non_blank(self.q);
        if search
            .as_ref()
            .is_some_and(|s| s.chars().count() > MAX_SEARCH_LENGTH)
        {
            return Err(FilterError::SearchTooLong);
        }

        let condition = non_blank(self.condition)
            .map(|c| c.parse::<Condition>())
            .transpose()
            .map_err(FilterError::InvalidCondition)?;

        let item_type = non_blank(self.item_type)
            .map(|t| t.parse::<ItemType>())
            .transpose()
            .map_err(FilterError::InvalidItemType)?;

        let mut min_price = parse_price(self.min_price)?;
        let mut max_price = parse_price(self.max_price)?;
        if let (Some(min), Some(max)) = (min_price, max_price)
            && min > max
        {
            (min_price, max_price) = (Some(max), Some(min));
        }

        let sort = match non_blank(self.sort) {
            Some(s) => s.parse()?,
            None => SortOrder::default(),
        };

        Ok(ProductFilter {
            search,
            theme: non_blank(self.theme),
            condition,
            item_type,
            series: self.series.filter(|s| *s > 0),
            min_price,
            max_price,
            in_stock: self.in_stock.unwrap_or(true),
            sort,
            page: self.page.unwrap_or(1).max(1),
            per_page: self
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_price(value: Option<String>) -> Result<Option<Decimal>, FilterError> {
    let Some(raw) = non_blank(value) else {
        return Ok(None);
    };
    let price: Decimal = raw
        .parse()
        .map_err(|_| FilterError::InvalidPrice(raw.clone()))?;
    if price.is_sign_negative() {
        return Err(FilterError::InvalidPrice(raw));
    }
    Ok(Some(price))
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Build a page from the rows of the current page and the total match count.
    #[must_use]
    pub fn new(items: Vec<T>, filter: &ProductFilter, total: i64) -> Self {
        let per_page = i64::from(filter.per_page.max(1));
        Self {
            items,
            page: filter.page,
            per_page: filter.per_page,
            total,
            total_pages: (total.max(0) + per_page - 1) / per_page,
        }
    }
}

/// A facet bucket (theme or series) with its listing count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet<K> {
    pub key: K,
    pub count: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_uses_defaults() {
        let filter = CatalogQuery::default().into_filter().unwrap();
        assert_eq!(filter, ProductFilter::default());
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn test_blank_strings_are_absent() {
        let filter = CatalogQuery {
            q: Some("   ".to_string()),
            theme: Some(String::new()),
            condition: Some(" ".to_string()),
            ..CatalogQuery::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.search, None);
        assert_eq!(filter.theme, None);
        assert_eq!(filter.condition, None);
    }

    #[test]
    fn test_parses_condition_type_and_sort() {
        let filter = CatalogQuery {
            condition: Some("used".to_string()),
            item_type: Some("M".to_string()),
            sort: Some("price_desc".to_string()),
            ..CatalogQuery::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.condition, Some(Condition::Used));
        assert_eq!(filter.item_type, Some(ItemType::Minifig));
        assert_eq!(filter.sort, SortOrder::PriceDesc);
    }

    #[test]
    fn test_inverted_price_range_is_swapped() {
        let filter = CatalogQuery {
            min_price: Some("20".to_string()),
            max_price: Some("5.50".to_string()),
            ..CatalogQuery::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.min_price, Some(Decimal::new(550, 2)));
        assert_eq!(filter.max_price, Some(Decimal::new(20, 0)));
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_price = CatalogQuery {
            min_price: Some("-1".to_string()),
            ..CatalogQuery::default()
        };
        assert!(matches!(
            bad_price.into_filter(),
            Err(FilterError::InvalidPrice(_))
        ));

        let bad_sort = CatalogQuery {
            sort: Some("random".to_string()),
            ..CatalogQuery::default()
        };
        assert!(matches!(
            bad_sort.into_filter(),
            Err(FilterError::InvalidSort(_))
        ));

        let long = CatalogQuery {
            q: Some("x".repeat(MAX_SEARCH_LENGTH + 1)),
            ..CatalogQuery::default()
        };
        assert_eq!(long.into_filter(), Err(FilterError::SearchTooLong));
    }

    #[test]
    fn test_pagination_is_clamped() {
        let filter = CatalogQuery {
            page: Some(0),
            per_page: Some(1000),
            ..CatalogQuery::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.per_page, MAX_PER_PAGE);

        let third = ProductFilter {
            page: 3,
            per_page: 10,
            ..ProductFilter::default()
        };
        assert_eq!(third.offset(), 20);
        assert_eq!(third.limit(), 10);
    }

    #[test]
    fn test_page_total_pages() {
        let filter = ProductFilter {
            per_page: 10,
            ..ProductFilter::default()
        };
        assert_eq!(Page::<u8>::new(vec![], &filter, 0).total_pages, 0);
        assert_eq!(Page::<u8>::new(vec![], &filter, 10).total_pages, 1);
        assert_eq!(Page::<u8>::new(vec![], &filter, 11).total_pages, 2);
    }
}
