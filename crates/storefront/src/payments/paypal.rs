//! `PayPal` REST client (Orders v2, Payments v2).
//!
//! Authenticates with OAuth2 client credentials. The access token is cached
//! in memory and refreshed a minute before it expires.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use brickhaus_core::Price;

use super::{HTTP_TIMEOUT, PaymentError, api_error};
use crate::config::PayPalConfig;
use crate::models::NewOrder;

const PROVIDER: &str = "PayPal";

/// Refresh the token this many seconds before `PayPal` says it expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// `PayPal` REST API client.
///
/// Cheaply cloneable; clones share the token cache.
#[derive(Clone)]
pub struct PayPalClient {
    inner: Arc<PayPalClientInner>,
}

struct PayPalClientInner {
    client: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: SecretString,
    token: RwLock<Option<AccessToken>>,
}

#[derive(Clone)]
struct AccessToken {
    value: SecretString,
    /// Unix timestamp when the token expires.
    expires_at: i64,
}

impl AccessToken {
    fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at - TOKEN_REFRESH_MARGIN_SECS
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
}

// =============================================================================
// Request / response types
// =============================================================================

/// A money amount as `PayPal` expects it: ISO code plus a two-decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub currency_code: String,
    pub value: String,
}

impl From<Price> for Money {
    fn from(price: Price) -> Self {
        Self {
            currency_code: price.currency_code.code().to_string(),
            value: price.amount_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    intent: &'static str,
    purchase_units: Vec<PurchaseUnit>,
    payment_source: PaymentSource,
}

#[derive(Debug, Serialize)]
struct PurchaseUnit {
    reference_id: String,
    custom_id: String,
    description: String,
    amount: Amount,
    items: Vec<Item>,
}

#[derive(Debug, Serialize)]
struct Amount {
    currency_code: String,
    value: String,
    breakdown: Breakdown,
}

#[derive(Debug, Serialize)]
struct Breakdown {
    item_total: Money,
    shipping: Money,
}

#[derive(Debug, Serialize)]
struct Item {
    name: String,
    sku: String,
    quantity: String,
    unit_amount: Money,
    category: &'static str,
}

#[derive(Debug, Serialize)]
struct PaymentSource {
    paypal: PayPalSource,
}

#[derive(Debug, Serialize)]
struct PayPalSource {
    experience_context: ExperienceContext,
}

#[derive(Debug, Serialize)]
struct ExperienceContext {
    brand_name: &'static str,
    user_action: &'static str,
    shipping_preference: &'static str,
    return_url: String,
    cancel_url: String,
}

/// A `PayPal` order as returned by create, get and capture.
#[derive(Debug, Clone, Deserialize)]
pub struct PayPalOrder {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub payer: Option<Payer>,
    #[serde(default)]
    pub purchase_units: Vec<PurchaseUnitResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payer {
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub name: Option<PayerName>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayerName {
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseUnitResponse {
    #[serde(default)]
    pub payments: Option<Payments>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payments {
    #[serde(default)]
    pub captures: Vec<Capture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Capture {
    pub id: String,
    pub status: String,
}

impl PayPalOrder {
    /// URL the buyer is sent to for approval.
    #[must_use]
    pub fn approve_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == "payer-action" || link.rel == "approve")
            .map(|link| link.href.as_str())
    }

    /// Whether the order has been captured.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == "COMPLETED"
    }

    /// Id of the first completed capture.
    #[must_use]
    pub fn capture_id(&self) -> Option<&str> {
        self.purchase_units
            .iter()
            .filter_map(|unit| unit.payments.as_ref())
            .flat_map(|payments| &payments.captures)
            .find(|capture| capture.status == "COMPLETED")
            .map(|capture| capture.id.as_str())
    }

    /// Payer email, if `PayPal` shared it.
    #[must_use]
    pub fn payer_email(&self) -> Option<&str> {
        self.payer.as_ref()?.email_address.as_deref()
    }

    /// Payer full name, if `PayPal` shared it.
    #[must_use]
    pub fn payer_name(&self) -> Option<String> {
        let name = self.payer.as_ref()?.name.as_ref()?;
        let full = [name.given_name.as_deref(), name.surname.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        (!full.is_empty()).then_some(full)
    }
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
    status: String,
}

// =============================================================================
// Client
// =============================================================================

impl PayPalClient {
    /// Create a new `PayPal` client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &PayPalConfig) -> Self {
        Self::with_api_base(config, config.mode.api_base())
    }

    /// Create a client against a custom API base URL (used by tests).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn with_api_base(config: &PayPalConfig, api_base: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(PayPalClientInner {
                client,
                api_base: api_base.trim_end_matches('/').to_string(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                token: RwLock::new(None),
            }),
        }
    }

    /// Get a valid access token, fetching a new one if the cached one is
    /// missing or about to expire.
    async fn access_token(&self) -> Result<SecretString, PaymentError> {
        let now = chrono::Utc::now().timestamp();
        if let Some(token) = self.inner.token.read().await.as_ref()
            && !token.is_expired(now)
        {
            return Ok(token.value.clone());
        }

        let mut guard = self.inner.token.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(token) = guard.as_ref()
            && !token.is_expired(now)
        {
            return Ok(token.value.clone());
        }

        debug!("Fetching PayPal access token");
        let credentials = BASE64.encode(format!(
            "{}:{}",
            self.inner.client_id,
            self.inner.client_secret.expose_secret()
        ));

        let response = self
            .inner
            .client
            .post(format!("{}/v1/oauth2/token", self.inner.api_base))
            .header("Authorization", format!("Basic {credentials}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response).await);
        }

        let body: TokenResponse = response.json().await?;
        let token = AccessToken {
            value: SecretString::from(body.access_token),
            expires_at: now + body.expires_in,
        };
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    /// Create a `PayPal` order for a pending shop order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if `PayPal` rejects the order.
    #[instrument(skip(self, order), fields(reference = %order.reference))]
    pub async fn create_order(
        &self,
        order: &NewOrder,
        return_url: &str,
        cancel_url: &str,
    ) -> Result<PayPalOrder, PaymentError> {
        let token = self.access_token().await?;
        let body = create_order_request(order, return_url, cancel_url);

        let response = self
            .inner
            .client
            .post(format!("{}/v2/checkout/orders", self.inner.api_base))
            .bearer_auth(token.expose_secret())
            .header("PayPal-Request-Id", order.reference.to_string())
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response).await);
        }
        Ok(response.json().await?)
    }

    /// Capture an approved order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if `PayPal` refuses the capture (for
    /// example `ORDER_NOT_APPROVED` or `ORDER_ALREADY_CAPTURED`).
    #[instrument(skip(self))]
    pub async fn capture_order(&self, paypal_order_id: &str) -> Result<PayPalOrder, PaymentError> {
        let token = self.access_token().await?;

        let response = self
            .inner
            .client
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.inner.api_base,
                urlencoding::encode(paypal_order_id)
            ))
            .bearer_auth(token.expose_secret())
            .header("PayPal-Request-Id", format!("capture-{paypal_order_id}"))
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({}))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response).await);
        }
        Ok(response.json().await?)
    }

    /// Fetch an order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn get_order(&self, paypal_order_id: &str) -> Result<PayPalOrder, PaymentError> {
        let token = self.access_token().await?;

        let response = self
            .inner
            .client
            .get(format!(
                "{}/v2/checkout/orders/{}",
                self.inner.api_base,
                urlencoding::encode(paypal_order_id)
            ))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response).await);
        }
        Ok(response.json().await?)
    }

    /// Refund a capture in full. Returns the refund id.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if `PayPal` refuses the refund.
    #[instrument(skip(self))]
    pub async fn refund_capture(&self, capture_id: &str) -> Result<String, PaymentError> {
        let token = self.access_token().await?;

        let response = self
            .inner
            .client
            .post(format!(
                "{}/v2/payments/captures/{}/refund",
                self.inner.api_base,
                urlencoding::encode(capture_id)
            ))
            .bearer_auth(token.expose_secret())
            .header("PayPal-Request-Id", format!("refund-{capture_id}"))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response).await);
        }

        let refund: RefundResponse = response.json().await?;
        debug!(refund_id = %refund.id, status = %refund.status, "PayPal refund created");
        Ok(refund.id)
    }
}

/// Build the Orders v2 request body for a shop order.
///
/// The amount carries an item/shipping breakdown that sums to the total, so
/// `PayPal` shows the same lines the customer saw.
fn create_order_request(order: &NewOrder, return_url: &str, cancel_url: &str) -> CreateOrderRequest {
    let currency = order.totals.total.currency_code;
    let reference = order.reference.to_string();

    let items = order
        .lines
        .iter()
        .map(|line| Item {
            // PayPal limits item names to 127 characters
            name: line.name.chars().take(127).collect(),
            sku: line.item_no.clone(),
            quantity: line.qty.to_string(),
            unit_amount: Price::new(line.unit_price, currency).into(),
            category: "PHYSICAL_GOODS",
        })
        .collect();

    CreateOrderRequest {
        intent: "CAPTURE",
        purchase_units: vec![PurchaseUnit {
            reference_id: reference.clone(),
            custom_id: reference,
            description: format!("Brickhaus order {}", order.reference.short_code()),
            amount: Amount {
                currency_code: currency.code().to_string(),
                value: order.totals.total.amount_string(),
                breakdown: Breakdown {
                    item_total: order.totals.subtotal.into(),
                    shipping: order.totals.shipping.into(),
                },
            },
            items,
        }],
        payment_source: PaymentSource {
            paypal: PayPalSource {
                experience_context: ExperienceContext {
                    brand_name: "Brickhaus",
                    user_action: "PAY_NOW",
                    shipping_preference: "GET_FROM_FILE",
                    return_url: return_url.to_string(),
                    cancel_url: cancel_url.to_string(),
                },
            },
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use brickhaus_core::cart::{ShippingPolicy, Totals};
    use brickhaus_core::{Condition, CurrencyCode, InventoryId, OrderReference, PaymentProvider};
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::NewOrderLine;

    fn order() -> NewOrder {
        let lines = vec![NewOrderLine {
            inventory_id: InventoryId::new(101),
            item_no: "sw0001a".to_string(),
            name: "Battle Droid".to_string(),
            condition: Condition::Used,
            unit_price: Decimal::new(25, 1),
            qty: 3,
            image_url: None,
        }];
        let policy = ShippingPolicy {
            flat_rate: Decimal::new(495, 2),
            free_over: None,
        };
        NewOrder {
            reference: OrderReference::generate(),
            provider: PaymentProvider::PayPal,
            totals: Totals::compute(Decimal::new(75, 1), &policy, CurrencyCode::EUR),
            email: None,
            customer_name: None,
            lines,
        }
    }

    #[test]
    fn test_money_has_two_decimals() {
        let money = Money::from(Price::new(Decimal::new(5, 0), CurrencyCode::USD));
        assert_eq!(money.value, "5.00");
        assert_eq!(money.currency_code, "USD");
    }

    #[test]
    fn test_create_order_request_breakdown_sums_to_total() {
        let order = order();
        let body = serde_json::to_value(create_order_request(
            &order,
            "https://shop.test/return",
            "https://shop.test/cancel",
        ))
        .unwrap();

        let unit = &body["purchase_units"][0];
        assert_eq!(body["intent"], "CAPTURE");
        assert_eq!(unit["amount"]["value"], "12.45");
        assert_eq!(unit["amount"]["breakdown"]["item_total"]["value"], "7.50");
        assert_eq!(unit["amount"]["breakdown"]["shipping"]["value"], "4.95");
        assert_eq!(unit["items"][0]["unit_amount"]["value"], "2.50");
        assert_eq!(unit["items"][0]["quantity"], "3");
        assert_eq!(unit["custom_id"], order.reference.to_string());
        assert_eq!(
            body["payment_source"]["paypal"]["experience_context"]["return_url"],
            "https://shop.test/return"
        );
    }

    #[test]
    fn test_captured_order_accessors() {
        let json = r#"{
            "id": "5O190127TN364715T",
            "status": "COMPLETED",
            "payer": {
                "email_address": "buyer@example.com",
                "name": {"given_name": "Jane", "surname": "Doe"}
            },
            "purchase_units": [{
                "reference_id": "ref",
                "custom_id": "0f8fad5b-d9cb-469f-a165-70867728950e",
                "payments": {"captures": [{"id": "3C679366HH908993F", "status": "COMPLETED"}]}
            }]
        }"#;
        let order: PayPalOrder = serde_json::from_str(json).unwrap();
        assert!(order.is_completed());
        assert_eq!(order.capture_id(), Some("3C679366HH908993F"));
        assert_eq!(order.payer_email(), Some("buyer@example.com"));
        assert_eq!(order.payer_name().as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_approve_url() {
        let json = r#"{
            "id": "X",
            "status": "PAYER_ACTION_REQUIRED",
            "links": [
                {"href": "https://api.paypal.com/v2/checkout/orders/X", "rel": "self"},
                {"href": "https://www.paypal.com/checkoutnow?token=X", "rel": "payer-action"}
            ]
        }"#;
        let order: PayPalOrder = serde_json::from_str(json).unwrap();
        assert_eq!(
            order.approve_url(),
            Some("https://www.paypal.com/checkoutnow?token=X")
        );
        assert!(order.capture_id().is_none());
    }

    #[test]
    fn test_token_expiry_margin() {
        let token = AccessToken {
            value: SecretString::from("t"),
            expires_at: 1_000,
        };
        assert!(!token.is_expired(939));
        assert!(token.is_expired(940));
    }
}
