//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Error bodies are JSON: `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use brickhaus_core::catalog::FilterError;

use crate::db::RepositoryError;
use crate::payments::PaymentError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Checkout operation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Payment provider call failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Invalid catalog query.
    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or wrong admin token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL_MESSAGE: &str = "Internal server error";
const UPSTREAM_MESSAGE: &str = "Payment provider error";

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn payment_status(err: &PaymentError) -> StatusCode {
    match err {
        PaymentError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        PaymentError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
        PaymentError::Http(_) | PaymentError::Api { .. } | PaymentError::UnexpectedResponse(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::EmptyCart | CheckoutError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
        CheckoutError::UnknownItem(_)
        | CheckoutError::InsufficientStock { .. }
        | CheckoutError::InvalidTransition { .. }
        | CheckoutError::NotManuallyPayable(_)
        | CheckoutError::PaymentNotCompleted(_) => StatusCode::CONFLICT,
        CheckoutError::OrderNotFound => StatusCode::NOT_FOUND,
        CheckoutError::ProviderDisabled(_) => StatusCode::SERVICE_UNAVAILABLE,
        CheckoutError::Payment(e) => payment_status(e),
        CheckoutError::Repository(e) => repository_status(e),
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(e) => repository_status(e),
            Self::Checkout(e) => checkout_status(e),
            Self::Payment(e) => payment_status(e),
            Self::Filter(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client. Internal and upstream details stay in
    /// the logs.
    fn client_message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            return match status {
                StatusCode::BAD_GATEWAY => UPSTREAM_MESSAGE.to_string(),
                StatusCode::SERVICE_UNAVAILABLE => match self {
                    Self::Checkout(CheckoutError::ProviderDisabled(name)) => {
                        format!("{name} is not enabled")
                    }
                    _ => "Payment method is not enabled".to_string(),
                },
                _ => INTERNAL_MESSAGE.to_string(),
            };
        }

        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(_))
            | Self::Checkout(CheckoutError::Repository(RepositoryError::Conflict(_))) => {
                "Conflicts with the current state".to_string()
            }
            Self::Checkout(CheckoutError::Payment(PaymentError::InvalidSignature(_)))
            | Self::Payment(PaymentError::InvalidSignature(_)) => "Invalid signature".to_string(),
            Self::Checkout(e) => {
                let mut message = e.to_string();
                if let Some(first) = message.get_mut(..1) {
                    first.make_ascii_uppercase();
                }
                message
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if status == StatusCode::CONFLICT {
            tracing::info!(error = %self, "Request conflict");
        }

        let message = self.client_message(status);
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use brickhaus_core::{InventoryId, OrderStatus, PaymentProvider};
    use http_body_util::BodyExt;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        let cases = [
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Database(RepositoryError::NotFound), StatusCode::NOT_FOUND),
            (
                AppError::Database(RepositoryError::Conflict("dup".into())),
                StatusCode::CONFLICT,
            ),
            (AppError::Checkout(CheckoutError::EmptyCart), StatusCode::BAD_REQUEST),
            (
                AppError::Checkout(CheckoutError::InsufficientStock {
                    inventory_id: InventoryId::new(1),
                    requested: 2,
                    available: 1,
                }),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Checkout(CheckoutError::InvalidTransition {
                    from: OrderStatus::Cancelled,
                    to: OrderStatus::Paid,
                }),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Checkout(CheckoutError::NotManuallyPayable(PaymentProvider::PayPal)),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Checkout(CheckoutError::ProviderDisabled("Stripe")),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::Payment(PaymentError::Api {
                    provider: "PayPal",
                    status: 422,
                    message: "ORDER_NOT_APPROVED".into(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Payment(PaymentError::InvalidSignature("stale")),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, expected) in cases {
            let label = err.to_string();
            assert_eq!(err.status(), expected, "{label}");
        }
    }

    #[tokio::test]
    async fn test_error_body_is_json() {
        let (status, body) = body_of(AppError::Checkout(CheckoutError::EmptyCart)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "error": "Cart is empty" }));
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (_, body) = body_of(AppError::Internal("pool exhausted at 10.0.0.3".into())).await;
        assert_eq!(body["error"], INTERNAL_MESSAGE);

        let (_, body) = body_of(AppError::Payment(PaymentError::Api {
            provider: "Stripe",
            status: 500,
            message: "sk_live_leaky".into(),
        }))
        .await;
        assert_eq!(body["error"], UPSTREAM_MESSAGE);

        let (_, body) = body_of(AppError::Database(RepositoryError::Conflict(
            "duplicate key value violates unique constraint".into(),
        )))
        .await;
        assert_eq!(body["error"], "Conflicts with the current state");
    }

    #[tokio::test]
    async fn test_disabled_provider_is_named() {
        let (status, body) =
            body_of(AppError::Checkout(CheckoutError::ProviderDisabled("PayPal"))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "PayPal is not enabled");
    }
}
