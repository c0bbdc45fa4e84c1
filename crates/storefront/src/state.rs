//! Application state shared across handlers.

use std::sync::Arc;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;

use crate::cache::FacetCache;
use crate::config::StorefrontConfig;
use crate::payments::{PayPalClient, StripeClient};
use crate::services::EmailService;

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("email setup failed: {0}")]
    Email(#[from] SmtpError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    paypal: Option<PayPalClient>,
    stripe: Option<StripeClient>,
    email: Option<EmailService>,
    facets: FacetCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Payment clients and the mailer are only built for the integrations
    /// that are configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let paypal = config.paypal.as_ref().map(PayPalClient::new);
        let stripe = config.stripe.as_ref().map(StripeClient::new);
        let email = config
            .email
            .as_ref()
            .map(|email| EmailService::new(email, &config.base_url))
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                paypal,
                stripe,
                email,
                facets: FacetCache::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// `PayPal` client, if `PayPal` is configured.
    #[must_use]
    pub fn paypal(&self) -> Option<&PayPalClient> {
        self.inner.paypal.as_ref()
    }

    /// Stripe client, if Stripe is configured.
    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.inner.stripe.as_ref()
    }

    /// Mailer, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Theme/series facet cache.
    #[must_use]
    pub fn facets(&self) -> &FacetCache {
        &self.inner.facets
    }
}
