//! BrickLink Store API v1 client.
//!
//! Read-only access to the store's inventory and the public catalog, used by
//! the `bh-cli` sync and enrichment commands. Every request is signed with
//! OAuth 1.0a (see [`oauth`]).

pub mod oauth;
pub mod types;

pub use oauth::OAuthCredentials;
pub use types::{CatalogItem, Category, InventoryItem, parse_inventory_export};

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use brickhaus_core::ItemType;

use types::Envelope;

const DEFAULT_API_BASE: &str = "https://api.bricklink.com/api/store/v1";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when talking to BrickLink.
#[derive(Debug, Error)]
pub enum BrickLinkError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// BrickLink answered with an error `meta` block.
    #[error("BrickLink API error {code}: {message} ({description})")]
    Api {
        code: u16,
        message: String,
        description: String,
    },

    /// The response body was not the JSON we expected.
    #[error("failed to parse BrickLink response: {0}")]
    Parse(String),

    /// An inventory lot could not be mapped onto a catalog row.
    #[error("inventory lot {inventory_id}: {reason}")]
    InvalidItem { inventory_id: i64, reason: String },
}

impl BrickLinkError {
    /// Whether retrying the same request could succeed.
    ///
    /// Transport failures, 5xx and 429 meta codes are transient; everything
    /// else (bad signature, unknown item) will fail again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { code, .. } => *code == 429 || *code >= 500,
            Self::Parse(_) | Self::InvalidItem { .. } => false,
        }
    }
}

/// Which lots `GET /inventories` should return.
#[derive(Debug, Clone, Default)]
pub struct InventoryQuery {
    /// Restrict to one item type.
    pub item_type: Option<ItemType>,
    /// BrickLink status filter, e.g. `Y` (available) or `S` (stockroom).
    /// Comma-separated; a leading `-` excludes.
    pub status: Option<String>,
}

impl InventoryQuery {
    /// Available minifigures only.
    #[must_use]
    pub fn minifigs() -> Self {
        Self {
            item_type: Some(ItemType::Minifig),
            status: Some("Y".to_string()),
        }
    }

    fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(item_type) = self.item_type {
            params.push(("item_type".to_string(), item_type.api_name().to_string()));
        }
        if let Some(status) = &self.status {
            params.push(("status".to_string(), status.clone()));
        }
        params
    }
}

/// BrickLink Store API client.
///
/// Cheaply cloneable.
#[derive(Clone)]
pub struct BrickLinkClient {
    inner: Arc<BrickLinkClientInner>,
}

struct BrickLinkClientInner {
    client: reqwest::Client,
    api_base: String,
    credentials: OAuthCredentials,
}

impl std::fmt::Debug for BrickLinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrickLinkClient")
            .field("api_base", &self.inner.api_base)
            .field("credentials", &self.inner.credentials)
            .finish_non_exhaustive()
    }
}

impl BrickLinkClient {
    /// Create a client against the production API.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self::with_api_base(credentials, DEFAULT_API_BASE)
    }

    /// Create a client against a custom base URL.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn with_api_base(credentials: OAuthCredentials, api_base: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(BrickLinkClientInner {
                client,
                api_base: api_base.trim_end_matches('/').to_string(),
                credentials,
            }),
        }
    }

    /// List store inventory lots.
    ///
    /// # Errors
    ///
    /// Returns `BrickLinkError` if the request fails or BrickLink reports an error.
    #[instrument(skip(self))]
    pub async fn inventories(
        &self,
        query: &InventoryQuery,
    ) -> Result<Vec<InventoryItem>, BrickLinkError> {
        let items: Vec<InventoryItem> = self.get("/inventories", &query.params()).await?;
        debug!(count = items.len(), "Fetched inventory lots");
        Ok(items)
    }

    /// Fetch a catalog item.
    ///
    /// # Errors
    ///
    /// Returns `BrickLinkError` if the request fails or the item does not exist.
    #[instrument(skip(self))]
    pub async fn catalog_item(
        &self,
        item_type: ItemType,
        item_no: &str,
    ) -> Result<CatalogItem, BrickLinkError> {
        let path = format!(
            "/items/{}/{}",
            item_type.api_name(),
            urlencoding::encode(item_no)
        );
        self.get(&path, &[]).await
    }

    /// Fetch a catalog category.
    ///
    /// # Errors
    ///
    /// Returns `BrickLinkError` if the request fails or the category does not exist.
    #[instrument(skip(self))]
    pub async fn category(&self, category_id: i32) -> Result<Category, BrickLinkError> {
        self.get(&format!("/categories/{category_id}"), &[]).await
    }

    /// Signed GET returning the envelope's `data`.
    ///
    /// BrickLink reports most errors with HTTP 200 and an error `meta`, so
    /// the body is decoded before the status is looked at.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, BrickLinkError> {
        let url = format!("{}{path}", self.inner.api_base);
        let authorization = self
            .inner
            .credentials
            .authorization_header("GET", &url, query);

        let response = self
            .inner
            .client
            .get(&url)
            .query(query)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        match serde_json::from_slice::<Envelope<T>>(&body) {
            Ok(envelope) => envelope.into_data(),
            Err(_) if !status.is_success() => Err(BrickLinkError::Api {
                code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("error").to_string(),
                description: String::from_utf8_lossy(&body).chars().take(200).collect(),
            }),
            Err(e) => Err(BrickLinkError::Parse(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_query_params() {
        assert!(InventoryQuery::default().params().is_empty());
        assert_eq!(
            InventoryQuery::minifigs().params(),
            vec![
                ("item_type".to_string(), "MINIFIG".to_string()),
                ("status".to_string(), "Y".to_string()),
            ]
        );
    }

    #[test]
    fn test_transient_errors() {
        let api = |code| BrickLinkError::Api {
            code,
            message: String::new(),
            description: String::new(),
        };
        assert!(api(503).is_transient());
        assert!(api(429).is_transient());
        assert!(!api(401).is_transient());
        assert!(!api(404).is_transient());
        assert!(!BrickLinkError::Parse("x".to_string()).is_transient());
    }
}
