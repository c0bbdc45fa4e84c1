//! Payment provider clients.
//!
//! Thin REST wrappers around the two card/wallet providers. Both are
//! optional: a provider is only constructed when its credentials are
//! configured, and checkout routes answer 503 otherwise.
//!
//! - [`paypal`] - Orders v2 create/capture, Payments v2 refunds
//! - [`stripe`] - Checkout Sessions, refunds and webhook signatures

pub mod paypal;
pub mod stripe;

pub use paypal::PayPalClient;
pub use stripe::StripeClient;

use std::time::Duration;

use thiserror::Error;

/// Timeout for every outbound provider request.
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when talking to a payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// The provider is not configured.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// A webhook signature was missing, malformed, stale or wrong.
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(&'static str),

    /// The provider answered with something we did not expect.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Turn a non-success response into [`PaymentError::Api`].
///
/// Both providers put a human-readable `message` in their error bodies
/// (Stripe nests it under `error`); the raw body is used otherwise.
pub(crate) async fn api_error(provider: &'static str, response: reqwest::Response) -> PaymentError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    PaymentError::Api {
        provider,
        status,
        message: error_message(&body),
    }
}

fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.chars().take(500).collect();
    };

    let message = value
        .get("error")
        .and_then(|e| e.get("message"))
        .or_else(|| value.get("message"))
        .and_then(serde_json::Value::as_str);

    let issue = value
        .get("details")
        .and_then(|d| d.get(0))
        .and_then(|d| d.get("issue"))
        .and_then(serde_json::Value::as_str);

    match (message, issue) {
        (Some(message), Some(issue)) => format!("{issue}: {message}"),
        (Some(message), None) => message.to_string(),
        (None, Some(issue)) => issue.to_string(),
        (None, None) => body.chars().take(500).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_stripe_shape() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"No such checkout.session"}}"#;
        assert_eq!(error_message(body), "No such checkout.session");
    }

    #[test]
    fn test_error_message_paypal_shape() {
        let body = r#"{"name":"UNPROCESSABLE_ENTITY","message":"The requested action could not be performed.","details":[{"issue":"ORDER_ALREADY_CAPTURED"}]}"#;
        assert_eq!(
            error_message(body),
            "ORDER_ALREADY_CAPTURED: The requested action could not be performed."
        );
    }

    #[test]
    fn test_error_message_plain_text() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
