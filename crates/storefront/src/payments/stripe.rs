//! Stripe client (Checkout Sessions, refunds, webhooks).
//!
//! Stripe's API takes form-encoded bodies with bracketed keys
//! (`line_items[0][price_data][currency]`), built by [`session_params`].
//! Webhook payloads are verified against the `Stripe-Signature` header:
//! `t=<unix time>,v1=<hex HMAC-SHA256 of "<t>.<payload>">`.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use tracing::instrument;

use brickhaus_core::Price;

use super::{HTTP_TIMEOUT, PaymentError, api_error};
use crate::config::StripeConfig;
use crate::models::NewOrder;

const PROVIDER: &str = "Stripe";
const API_BASE: &str = "https://api.stripe.com";

/// Maximum age of a webhook signature, in seconds.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
    webhook_secret: Option<SecretString>,
}

/// A Checkout Session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page. Only present while the session is open.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`.
    pub payment_status: String,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CheckoutSession {
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    #[must_use]
    pub fn customer_email(&self) -> Option<&str> {
        self.customer_details.as_ref()?.email.as_deref()
    }

    #[must_use]
    pub fn customer_name(&self) -> Option<&str> {
        self.customer_details.as_ref()?.name.as_deref()
    }
}

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self::with_api_base(config, API_BASE)
    }

    /// Create a client against a custom API base URL (used by tests).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn with_api_base(config: &StripeConfig, api_base: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: api_base.trim_end_matches('/').to_string(),
                secret_key: config.secret_key.clone(),
                webhook_secret: config.webhook_secret.clone(),
            }),
        }
    }

    /// Whether webhook verification is possible.
    #[must_use]
    pub fn has_webhook_secret(&self) -> bool {
        self.inner.webhook_secret.is_some()
    }

    /// Create a Checkout Session for a pending shop order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if Stripe rejects the session.
    #[instrument(skip(self, order), fields(reference = %order.reference))]
    pub async fn create_checkout_session(
        &self,
        order: &NewOrder,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = session_params(order, success_url, cancel_url)?;

        let response = self
            .inner
            .client
            .post(format!("{}/v1/checkout/sessions", self.inner.api_base))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .header("Idempotency-Key", order.reference.to_string())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response).await);
        }
        Ok(response.json().await?)
    }

    /// Retrieve a Checkout Session.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if the session does not exist.
    #[instrument(skip(self))]
    pub async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .inner
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.inner.api_base,
                urlencoding::encode(session_id)
            ))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response).await);
        }
        Ok(response.json().await?)
    }

    /// Refund a payment intent in full. Returns the refund id.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` if Stripe refuses the refund.
    #[instrument(skip(self))]
    pub async fn refund(&self, payment_intent: &str) -> Result<String, PaymentError> {
        let response = self
            .inner
            .client
            .post(format!("{}/v1/refunds", self.inner.api_base))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .header("Idempotency-Key", format!("refund-{payment_intent}"))
            .form(&[("payment_intent", payment_intent)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response).await);
        }
        let refund: RefundResponse = response.json().await?;
        Ok(refund.id)
    }

    /// Verify a webhook payload and parse its event.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotConfigured` without a webhook secret,
    /// `PaymentError::InvalidSignature` for a bad or stale signature and
    /// `PaymentError::UnexpectedResponse` if the payload is not an event.
    pub fn parse_webhook(&self, payload: &[u8], signature_header: &str) -> Result<WebhookEvent, PaymentError> {
        let secret = self
            .inner
            .webhook_secret
            .as_ref()
            .ok_or(PaymentError::NotConfigured("Stripe webhook"))?;

        verify_signature(
            payload,
            signature_header,
            secret.expose_secret(),
            chrono::Utc::now().timestamp(),
        )?;

        serde_json::from_slice(payload)
            .map_err(|e| PaymentError::UnexpectedResponse(format!("invalid webhook payload: {e}")))
    }
}

/// Verify a `Stripe-Signature` header against a payload.
///
/// Any of several `v1` signatures may match (Stripe sends one per active
/// secret while a secret is being rolled).
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` describing the first problem found.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(PaymentError::InvalidSignature("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature("missing v1 signature"));
    }
    if (now - timestamp).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature("timestamp outside tolerance"));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::InvalidSignature("unusable secret"))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matches = signatures.iter().any(|signature| {
        hex::decode(signature).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });
    if matches {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature("signature mismatch"))
    }
}

/// Form parameters for a Checkout Session.
///
/// One line item per order line plus a separate shipping line when shipping
/// is charged. Amounts are in minor units.
///
/// # Errors
///
/// Returns `PaymentError::UnexpectedResponse` if an amount does not fit in
/// Stripe's integer range.
pub fn session_params(
    order: &NewOrder,
    success_url: &str,
    cancel_url: &str,
) -> Result<Vec<(String, String)>, PaymentError> {
    let currency = order.totals.total.currency_code;
    let reference = order.reference.to_string();

    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("client_reference_id".to_string(), reference.clone()),
        ("metadata[order_reference]".to_string(), reference),
        ("success_url".to_string(), success_url.to_string()),
        ("cancel_url".to_string(), cancel_url.to_string()),
    ];
    if let Some(email) = &order.email {
        params.push(("customer_email".to_string(), email.as_str().to_string()));
    }

    let mut push_line = |index: usize, name: &str, price: Price, qty: i32| -> Result<(), PaymentError> {
        let cents = price
            .minor_units()
            .ok_or_else(|| PaymentError::UnexpectedResponse(format!("amount out of range: {price}")))?;
        let key = |field: &str| format!("line_items[{index}]{field}");
        params.push((key("[price_data][currency]"), currency.stripe_code()));
        params.push((key("[price_data][product_data][name]"), name.to_string()));
        params.push((key("[price_data][unit_amount]"), cents.to_string()));
        params.push((key("[quantity]"), qty.to_string()));
        Ok(())
    };

    for (index, line) in order.lines.iter().enumerate() {
        push_line(index, &line.name, Price::new(line.unit_price, currency), line.qty)?;
    }
    if !order.totals.shipping.amount.is_zero() {
        push_line(order.lines.len(), "Shipping", order.totals.shipping, 1)?;
    }

    Ok(params)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use brickhaus_core::cart::{ShippingPolicy, Totals};
    use brickhaus_core::{Condition, CurrencyCode, Email, InventoryId, OrderReference, PaymentProvider};
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::NewOrderLine;

    const SECRET: &str = "whsec_test123secret456";

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_is_accepted() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = format!("t=1700000000,v1={}", sign(payload, SECRET, 1_700_000_000));
        assert!(verify_signature(payload, &header, SECRET, 1_700_000_010).is_ok());
    }

    #[test]
    fn test_any_v1_signature_may_match() {
        let payload = b"{}";
        let header = format!(
            "t=1700000000,v1={},v1={},v0=legacy",
            sign(payload, "whsec_old", 1_700_000_000),
            sign(payload, SECRET, 1_700_000_000)
        );
        assert!(verify_signature(payload, &header, SECRET, 1_700_000_000).is_ok());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let payload = b"{}";
        let header = format!("t=1700000000,v1={}", sign(payload, "wrong_secret", 1_700_000_000));
        assert!(matches!(
            verify_signature(payload, &header, SECRET, 1_700_000_000),
            Err(PaymentError::InvalidSignature("signature mismatch"))
        ));
    }

    #[test]
    fn test_modified_payload_is_rejected() {
        let header = format!("t=1700000000,v1={}", sign(b"{\"a\":1}", SECRET, 1_700_000_000));
        assert!(verify_signature(b"{\"a\":2}", &header, SECRET, 1_700_000_000).is_err());
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let payload = b"{}";
        let header = format!("t=1700000000,v1={}", sign(payload, SECRET, 1_700_000_000));
        assert!(matches!(
            verify_signature(payload, &header, SECRET, 1_700_000_000 + 600),
            Err(PaymentError::InvalidSignature("timestamp outside tolerance"))
        ));
    }

    #[test]
    fn test_malformed_headers_are_rejected() {
        for header in ["", "garbage", "v1=abc", "t=1700000000", "t=notanumber,v1=abc"] {
            assert!(
                verify_signature(b"{}", header, SECRET, 1_700_000_000).is_err(),
                "header {header:?} should be rejected"
            );
        }
    }

    fn order(shipping_cents: i64) -> NewOrder {
        let policy = ShippingPolicy {
            flat_rate: Decimal::new(shipping_cents, 2),
            free_over: None,
        };
        NewOrder {
            reference: OrderReference::generate(),
            provider: PaymentProvider::Stripe,
            totals: Totals::compute(Decimal::new(1250, 2), &policy, CurrencyCode::EUR),
            email: Some(Email::parse("buyer@example.com").unwrap()),
            customer_name: None,
            lines: vec![NewOrderLine {
                inventory_id: InventoryId::new(5),
                item_no: "hp001".to_string(),
                name: "Harry Potter".to_string(),
                condition: Condition::New,
                unit_price: Decimal::new(625, 2),
                qty: 2,
                image_url: None,
            }],
        }
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_session_params_lines_and_shipping() {
        let order = order(495);
        let params = session_params(&order, "https://s/ok", "https://s/no").unwrap();

        assert_eq!(param(&params, "mode"), Some("payment"));
        assert_eq!(
            param(&params, "client_reference_id"),
            Some(order.reference.to_string().as_str())
        );
        assert_eq!(param(&params, "customer_email"), Some("buyer@example.com"));
        assert_eq!(param(&params, "line_items[0][price_data][currency]"), Some("eur"));
        assert_eq!(param(&params, "line_items[0][price_data][unit_amount]"), Some("625"));
        assert_eq!(param(&params, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            param(&params, "line_items[1][price_data][product_data][name]"),
            Some("Shipping")
        );
        assert_eq!(param(&params, "line_items[1][price_data][unit_amount]"), Some("495"));
    }

    #[test]
    fn test_session_params_free_shipping_has_no_shipping_line() {
        let params = session_params(&order(0), "https://s/ok", "https://s/no").unwrap();
        assert!(param(&params, "line_items[1][quantity]").is_none());
    }

    #[test]
    fn test_checkout_session_deserializes() {
        let json = r#"{
            "id": "cs_test_a1",
            "object": "checkout.session",
            "payment_status": "paid",
            "status": "complete",
            "client_reference_id": "0f8fad5b-d9cb-469f-a165-70867728950e",
            "payment_intent": "pi_123",
            "customer_details": {"email": "buyer@example.com", "name": "Jane Doe"},
            "url": null
        }"#;
        let session: CheckoutSession = serde_json::from_str(json).unwrap();
        assert!(session.is_paid());
        assert_eq!(session.customer_email(), Some("buyer@example.com"));
        assert_eq!(session.payment_intent.as_deref(), Some("pi_123"));
    }
}
